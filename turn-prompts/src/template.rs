//! Template sections with `{{function}}` and `{{$variable}}` interpolation.

use async_trait::async_trait;
use serde_json::Value;
use turn_primitives::{Message, MessageRole};

use crate::error::{PromptError, PromptResult};
use crate::section::{PromptSection, RenderContext, RenderedSection, SectionBudget};
use crate::text::{LeafSettings, leaf_builders};

#[derive(Clone, Debug, PartialEq, Eq)]
enum TemplatePart {
    Text(String),
    Variable(String),
    Function { name: String, args: Vec<String> },
}

/// Text section whose content is interpolated from memory and functions.
///
/// `{{$conversation.topic}}` reads a memory path, `{{name}}` calls a registered
/// function and `{{name arg 'quoted arg'}}` passes arguments. Strings render
/// verbatim, other JSON values render as JSON, and missing values render empty.
#[derive(Clone, Debug, PartialEq)]
pub struct TemplateSection {
    template: String,
    parts: Vec<TemplatePart>,
    role: MessageRole,
    settings: LeafSettings,
}

impl TemplateSection {
    /// Parses `template` into a required section with an automatic budget.
    ///
    /// # Errors
    ///
    /// Returns [`PromptError::InvalidTemplate`] for an unclosed `{{`, an empty
    /// expression, or an unterminated quoted argument.
    pub fn new(template: impl Into<String>, role: MessageRole) -> PromptResult<Self> {
        let template = template.into();
        let parts = parse_template(&template)?;
        Ok(Self {
            template,
            parts,
            role,
            settings: LeafSettings::default(),
        })
    }

    /// Returns the unparsed template text.
    #[must_use]
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Returns the role of the rendered message.
    #[must_use]
    pub const fn role(&self) -> MessageRole {
        self.role
    }

    /// Returns the function names the template calls, in order of appearance.
    #[must_use]
    pub fn function_refs(&self) -> Vec<&str> {
        self.parts
            .iter()
            .filter_map(|part| match part {
                TemplatePart::Function { name, .. } => Some(name.as_str()),
                _ => None,
            })
            .collect()
    }

    async fn interpolate(&self, ctx: &RenderContext<'_>) -> PromptResult<String> {
        let mut output = String::with_capacity(self.template.len());
        for part in &self.parts {
            match part {
                TemplatePart::Text(text) => output.push_str(text),
                TemplatePart::Variable(path) => {
                    output.push_str(&value_to_text(ctx.memory.get_value(path).as_ref()));
                }
                TemplatePart::Function { name, args } => {
                    let value = ctx
                        .functions
                        .invoke(name, &ctx.function_context(), args)
                        .await?;
                    output.push_str(&value_to_text(Some(&value)));
                }
            }
        }
        Ok(output)
    }
}

leaf_builders!(TemplateSection);

#[async_trait]
impl PromptSection for TemplateSection {
    fn required(&self) -> bool {
        self.settings.required
    }

    fn budget(&self) -> SectionBudget {
        self.settings.budget
    }

    async fn render_as_messages(
        &self,
        ctx: &RenderContext<'_>,
        max_tokens: usize,
    ) -> PromptResult<RenderedSection<Vec<Message>>> {
        let text = self.interpolate(ctx).await?;
        Ok(self.settings.fit_message(ctx, self.role, text, max_tokens))
    }

    async fn render_as_text(
        &self,
        ctx: &RenderContext<'_>,
        max_tokens: usize,
    ) -> PromptResult<RenderedSection<String>> {
        let text = self.interpolate(ctx).await?;
        Ok(self.settings.fit_prefixed_text(ctx, &text, max_tokens))
    }
}

/// Renders a JSON value for inclusion in prompt text.
pub(crate) fn value_to_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
    }
}

fn parse_template(template: &str) -> PromptResult<Vec<TemplatePart>> {
    let mut parts = Vec::new();
    let mut text = String::new();
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        text.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = after.find("}}").ok_or_else(|| {
            PromptError::invalid_template(format!(
                "unclosed `{{{{` at offset {}",
                template.len() - rest.len() + start
            ))
        })?;

        let expression = after[..end].trim();
        if expression.is_empty() {
            return Err(PromptError::invalid_template("empty `{{}}` expression"));
        }
        if !text.is_empty() {
            parts.push(TemplatePart::Text(std::mem::take(&mut text)));
        }
        parts.push(parse_expression(expression)?);
        rest = &after[end + 2..];
    }

    text.push_str(rest);
    if !text.is_empty() {
        parts.push(TemplatePart::Text(text));
    }
    Ok(parts)
}

fn parse_expression(expression: &str) -> PromptResult<TemplatePart> {
    if let Some(path) = expression.strip_prefix('$') {
        let path = path.trim();
        if path.is_empty() {
            return Err(PromptError::invalid_template("empty variable reference"));
        }
        return Ok(TemplatePart::Variable(path.to_owned()));
    }

    let mut tokens = split_arguments(expression)?.into_iter();
    let name = tokens
        .next()
        .ok_or_else(|| PromptError::invalid_template("missing function name"))?;
    Ok(TemplatePart::Function {
        name,
        args: tokens.collect(),
    })
}

fn split_arguments(expression: &str) -> PromptResult<Vec<String>> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;

    for ch in expression.chars() {
        match quote {
            Some(open) if ch == open => {
                tokens.push(std::mem::take(&mut current));
                quote = None;
            }
            Some(_) => current.push(ch),
            None if matches!(ch, '\'' | '"' | '`') => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
                quote = Some(ch);
            }
            None if ch.is_whitespace() => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            None => current.push(ch),
        }
    }

    if let Some(open) = quote {
        return Err(PromptError::invalid_template(format!(
            "unterminated {open} quoted argument in `{expression}`"
        )));
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use turn_memory::{Memory, TurnState};
    use turn_primitives::{CancellationToken, CharTokenizer};

    use crate::PromptFunctions;

    #[test]
    fn parses_variables_functions_and_arguments() {
        let parts = parse_template("Hi {{$user.name}}, {{lookup city 'New York'}}!").unwrap();
        assert_eq!(
            parts,
            vec![
                TemplatePart::Text("Hi ".to_owned()),
                TemplatePart::Variable("user.name".to_owned()),
                TemplatePart::Text(", ".to_owned()),
                TemplatePart::Function {
                    name: "lookup".to_owned(),
                    args: vec!["city".to_owned(), "New York".to_owned()],
                },
                TemplatePart::Text("!".to_owned()),
            ]
        );
    }

    #[test]
    fn rejects_malformed_templates() {
        for template in ["Hello {{name", "Hello {{ }}", "{{$}}", "{{fn 'open}}"] {
            let err = TemplateSection::new(template, MessageRole::System).expect_err(template);
            assert!(matches!(err, PromptError::InvalidTemplate { .. }), "{template}");
        }
    }

    #[tokio::test]
    async fn interpolates_memory_and_functions() {
        let state = TurnState::new();
        state.set_value("user.name", json!("Ada")).unwrap();
        state.set_value("temp.count", json!(3)).unwrap();
        let functions = PromptFunctions::new();
        functions
            .register_fn("shout", |_memory, args| Ok(json!(args.join(" ").to_uppercase())))
            .unwrap();
        let cancel = CancellationToken::new();
        let ctx = RenderContext::new(&state, &functions, &CharTokenizer, &cancel);

        let section = TemplateSection::new(
            "{{$user.name}} has {{$count}} items{{$missing}}. {{shout 'be' loud}}",
            MessageRole::System,
        )
        .unwrap();
        let rendered = section.render_as_messages(&ctx, 1_000).await.unwrap();
        assert_eq!(
            rendered.output,
            vec![Message::system("Ada has 3 items. BE LOUD")]
        );
        assert_eq!(section.function_refs(), ["shout"]);
    }

    #[tokio::test]
    async fn unknown_functions_fail_the_render() {
        let state = TurnState::new();
        let functions = PromptFunctions::new();
        let cancel = CancellationToken::new();
        let ctx = RenderContext::new(&state, &functions, &CharTokenizer, &cancel);

        let section = TemplateSection::new("{{nope}}", MessageRole::System).unwrap();
        let err = section.render_as_text(&ctx, 10).await.expect_err("unknown");
        assert!(matches!(err, PromptError::UnknownFunction { .. }));
    }
}
