//! Budget allocation across sibling sections.
//!
//! Siblings are rendered in three passes: required fixed and auto sections in
//! full, each leaving room for the minimum of the required sections after it,
//! then optional fixed and auto sections in declaration order against what
//! remains, then share sections against a fraction of the remainder. If the
//! assembled output still overflows, optional sections are dropped from the end.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;
use turn_primitives::Message;

use crate::error::PromptResult;
use crate::section::{PromptSection, RenderContext, RenderedSection, SectionBudget};

/// Output form a layout produces.
#[async_trait]
pub(crate) trait LayoutMode: Send + Sync {
    type Output: Send;

    async fn render(
        section: &dyn PromptSection,
        ctx: &RenderContext<'_>,
        max_tokens: usize,
    ) -> PromptResult<RenderedSection<Self::Output>>;

    fn measure(
        ctx: &RenderContext<'_>,
        parts: &[&RenderedSection<Self::Output>],
        separator: &str,
    ) -> usize;

    fn assemble(outputs: Vec<Self::Output>, separator: &str) -> Self::Output;

    /// Tokens the join adds between two non-empty parts.
    fn separator_cost(ctx: &RenderContext<'_>, separator: &str) -> usize;

    fn is_empty(output: &Self::Output) -> bool;
}

pub(crate) struct TextMode;

#[async_trait]
impl LayoutMode for TextMode {
    type Output = String;

    async fn render(
        section: &dyn PromptSection,
        ctx: &RenderContext<'_>,
        max_tokens: usize,
    ) -> PromptResult<RenderedSection<String>> {
        section.render_as_text(ctx, max_tokens).await
    }

    fn measure(
        ctx: &RenderContext<'_>,
        parts: &[&RenderedSection<String>],
        separator: &str,
    ) -> usize {
        let joined = join_text(parts.iter().map(|part| part.output.as_str()), separator);
        ctx.tokenizer.count(&joined)
    }

    fn assemble(outputs: Vec<String>, separator: &str) -> String {
        join_text(outputs.iter().map(String::as_str), separator)
    }

    fn separator_cost(ctx: &RenderContext<'_>, separator: &str) -> usize {
        ctx.tokenizer.count(separator)
    }

    fn is_empty(output: &String) -> bool {
        output.is_empty()
    }
}

pub(crate) struct MessagesMode;

#[async_trait]
impl LayoutMode for MessagesMode {
    type Output = Vec<Message>;

    async fn render(
        section: &dyn PromptSection,
        ctx: &RenderContext<'_>,
        max_tokens: usize,
    ) -> PromptResult<RenderedSection<Vec<Message>>> {
        section.render_as_messages(ctx, max_tokens).await
    }

    fn measure(
        _ctx: &RenderContext<'_>,
        parts: &[&RenderedSection<Vec<Message>>],
        _separator: &str,
    ) -> usize {
        parts.iter().map(|part| part.length).sum()
    }

    fn assemble(outputs: Vec<Vec<Message>>, _separator: &str) -> Vec<Message> {
        outputs.into_iter().flatten().collect()
    }

    fn separator_cost(_ctx: &RenderContext<'_>, _separator: &str) -> usize {
        0
    }

    fn is_empty(output: &Vec<Message>) -> bool {
        output.is_empty()
    }
}

fn join_text<'a>(parts: impl Iterator<Item = &'a str>, separator: &str) -> String {
    parts
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(separator)
}

#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss
)]
fn share_of(pool: usize, share: f32) -> usize {
    (pool as f64 * f64::from(share.clamp(0.0, 1.0))).floor() as usize
}

/// Lays out `sections` within `max_tokens`.
pub(crate) async fn layout<M: LayoutMode>(
    sections: &[Arc<dyn PromptSection>],
    ctx: &RenderContext<'_>,
    max_tokens: usize,
    separator: &str,
) -> PromptResult<RenderedSection<M::Output>> {
    let mut rendered: Vec<Option<RenderedSection<M::Output>>> =
        sections.iter().map(|_| None).collect();
    let separator_cost = M::separator_cost(ctx, separator);
    let mut budget = LayoutBudget {
        remaining: max_tokens,
        separator_cost,
        non_empty: 0,
    };

    let required: Vec<usize> = sections
        .iter()
        .enumerate()
        .filter(|(_, section)| {
            section.required() && !matches!(section.budget(), SectionBudget::Share(_))
        })
        .map(|(index, _)| index)
        .collect();

    // Each required section leaves room for the minimum of those after it.
    let mut floors = vec![0; required.len()];
    for (slot, index) in required.iter().enumerate().skip(1) {
        ctx.check_cancelled()?;
        let minimum = M::render(sections[*index].as_ref(), ctx, 0).await?;
        if !M::is_empty(&minimum.output) {
            floors[slot] = minimum.length + separator_cost;
        }
    }
    let mut reserved: usize = floors.iter().sum();

    for (slot, index) in required.iter().enumerate() {
        ctx.check_cancelled()?;
        reserved -= floors[slot];
        let available = budget.available().saturating_sub(reserved);
        let output = M::render(sections[*index].as_ref(), ctx, available).await?;
        budget.charge::<M>(&output);
        rendered[*index] = Some(output);
    }

    for (index, section) in sections.iter().enumerate() {
        if section.required() || matches!(section.budget(), SectionBudget::Share(_)) {
            continue;
        }
        ctx.check_cancelled()?;
        let available = budget.available();
        let output = M::render(section.as_ref(), ctx, available).await?;
        if output.length > available {
            debug!(index, length = output.length, available, "dropping optional section");
            continue;
        }
        budget.charge::<M>(&output);
        rendered[index] = Some(output);
    }

    let pool = budget.remaining;
    for (index, section) in sections.iter().enumerate() {
        let SectionBudget::Share(share) = section.budget() else {
            continue;
        };
        ctx.check_cancelled()?;
        let available = share_of(pool, share).min(budget.available());
        let output = M::render(section.as_ref(), ctx, available).await?;
        if !section.required() && output.length > available {
            debug!(index, length = output.length, available, "dropping share section");
            continue;
        }
        budget.charge::<M>(&output);
        rendered[index] = Some(output);
    }

    let mut length = M::measure(ctx, &kept(&rendered), separator);
    while length > max_tokens {
        let Some(last_optional) = (0..sections.len())
            .rev()
            .find(|index| rendered[*index].is_some() && !sections[*index].required())
        else {
            break;
        };
        debug!(index = last_optional, length, max_tokens, "dropping trailing optional section");
        rendered[last_optional] = None;
        length = M::measure(ctx, &kept(&rendered), separator);
    }

    let outputs = rendered.into_iter().flatten().map(|part| part.output).collect();
    Ok(RenderedSection::new(
        M::assemble(outputs, separator),
        length,
        max_tokens,
    ))
}

/// Tokens left for siblings, net of the separators already committed.
struct LayoutBudget {
    remaining: usize,
    separator_cost: usize,
    non_empty: usize,
}

impl LayoutBudget {
    /// Space for the next child once the separator joining it is paid for.
    fn available(&self) -> usize {
        self.remaining.saturating_sub(self.pending_separator())
    }

    fn pending_separator(&self) -> usize {
        if self.non_empty == 0 {
            0
        } else {
            self.separator_cost
        }
    }

    fn charge<M: LayoutMode>(&mut self, output: &RenderedSection<M::Output>) {
        if M::is_empty(&output.output) {
            return;
        }
        self.remaining = self
            .remaining
            .saturating_sub(output.length + self.pending_separator());
        self.non_empty += 1;
    }
}

fn kept<T>(rendered: &[Option<RenderedSection<T>>]) -> Vec<&RenderedSection<T>> {
    rendered.iter().flatten().collect()
}
