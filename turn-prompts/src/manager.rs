//! Registry of named prompts backed by an optional prompts folder.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use tracing::{debug, info};
use turn_primitives::{ActionDefinition, MessageRole};

use crate::error::{PromptError, PromptResult};
use crate::functions::{PromptFunction, PromptFunctions};
use crate::group::Prompt;
use crate::history::ConversationHistory;
use crate::prompt_template::{PromptTemplate, PromptTemplateConfig};
use crate::section::PromptSection;
use crate::system::{UserInputMessage, UserMessage};
use crate::template::TemplateSection;

const CONFIG_FILE: &str = "config.json";
const PROMPT_FILE: &str = "skprompt.txt";
const ACTIONS_FILE: &str = "actions.json";

/// Settings applied when the manager builds prompts from folders.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PromptManagerOptions {
    /// Directory holding one sub-directory per prompt.
    pub prompts_folder: Option<PathBuf>,
    /// Memory path of the conversation history section.
    pub history_variable: String,
    /// Memory path of the user's input.
    pub input_variable: String,
}

impl Default for PromptManagerOptions {
    fn default() -> Self {
        Self {
            prompts_folder: None,
            history_variable: "conversation.history".to_owned(),
            input_variable: "temp.input".to_owned(),
        }
    }
}

/// Owns the template function registry and the named prompts.
///
/// Prompts are registered directly with [`PromptManager::add_prompt`] or loaded
/// lazily from `<prompts_folder>/<name>/` on first use, where `config.json` holds
/// the [`PromptTemplateConfig`], `skprompt.txt` the system template and the
/// optional `actions.json` the declared actions.
#[derive(Debug, Default)]
pub struct PromptManager {
    options: PromptManagerOptions,
    functions: PromptFunctions,
    prompts: RwLock<HashMap<String, PromptTemplate>>,
}

impl PromptManager {
    /// Creates a manager with default options and no prompts folder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a manager with the supplied options.
    #[must_use]
    pub fn with_options(options: PromptManagerOptions) -> Self {
        Self {
            options,
            functions: PromptFunctions::new(),
            prompts: RwLock::new(HashMap::new()),
        }
    }

    /// Creates a manager that loads prompts from `folder`.
    #[must_use]
    pub fn with_prompts_folder(folder: impl Into<PathBuf>) -> Self {
        Self::with_options(PromptManagerOptions {
            prompts_folder: Some(folder.into()),
            ..PromptManagerOptions::default()
        })
    }

    /// Returns the manager options.
    #[must_use]
    pub fn options(&self) -> &PromptManagerOptions {
        &self.options
    }

    /// Returns the template function registry.
    #[must_use]
    pub fn functions(&self) -> &PromptFunctions {
        &self.functions
    }

    /// Registers a template function.
    ///
    /// # Errors
    ///
    /// Returns [`PromptError::DuplicateFunction`] if the name is already present.
    pub fn add_function<T>(&self, name: impl Into<String>, function: T) -> PromptResult<()>
    where
        T: PromptFunction + 'static,
    {
        self.functions.register(name, function)
    }

    /// Registers a prompt.
    ///
    /// # Errors
    ///
    /// Returns [`PromptError::DuplicatePrompt`] if the name is already present.
    ///
    /// # Panics
    ///
    /// Panics if the internal prompt lock is poisoned.
    pub fn add_prompt(&self, template: PromptTemplate) -> PromptResult<()> {
        let mut prompts = self.prompts.write().expect("prompt manager poisoned");
        let name = template.name().to_owned();
        if prompts.contains_key(&name) {
            return Err(PromptError::DuplicatePrompt { name });
        }
        prompts.insert(name, template);
        Ok(())
    }

    /// Returns `true` when the prompt is registered or present in the prompts folder.
    ///
    /// # Panics
    ///
    /// Panics if the internal prompt lock is poisoned.
    pub async fn has_prompt(&self, name: &str) -> bool {
        if self
            .prompts
            .read()
            .expect("prompt manager poisoned")
            .contains_key(name)
        {
            return true;
        }
        match self.prompt_dir(name) {
            Some(dir) => tokio::fs::try_exists(dir.join(CONFIG_FILE))
                .await
                .unwrap_or(false),
            None => false,
        }
    }

    /// Returns the named prompt, loading it from the prompts folder if needed.
    ///
    /// # Errors
    ///
    /// Returns [`PromptError::NotFound`] when the prompt is neither registered nor
    /// on disk, and [`PromptError::Io`], [`PromptError::Config`], or
    /// [`PromptError::InvalidTemplate`] when its folder cannot be loaded.
    ///
    /// # Panics
    ///
    /// Panics if the internal prompt lock is poisoned.
    pub async fn get_prompt(&self, name: &str) -> PromptResult<PromptTemplate> {
        let cached = self
            .prompts
            .read()
            .expect("prompt manager poisoned")
            .get(name)
            .cloned();
        if let Some(template) = cached {
            return Ok(template);
        }

        let dir = self.prompt_dir(name).ok_or_else(|| PromptError::NotFound {
            name: name.to_owned(),
        })?;
        let template = self.load_prompt(name, &dir).await?;
        info!(prompt = name, path = %dir.display(), "loaded prompt from folder");

        let mut prompts = self.prompts.write().expect("prompt manager poisoned");
        Ok(prompts
            .entry(name.to_owned())
            .or_insert(template)
            .clone())
    }

    fn prompt_dir(&self, name: &str) -> Option<PathBuf> {
        self.options
            .prompts_folder
            .as_ref()
            .map(|folder| folder.join(name))
    }

    async fn load_prompt(&self, name: &str, dir: &Path) -> PromptResult<PromptTemplate> {
        let config_path = dir.join(CONFIG_FILE);
        if !tokio::fs::try_exists(&config_path).await.unwrap_or(false) {
            return Err(PromptError::NotFound {
                name: name.to_owned(),
            });
        }

        let config_text = read_file(&config_path).await?;
        let config: PromptTemplateConfig =
            serde_json::from_str(&config_text).map_err(|err| PromptError::Config {
                name: name.to_owned(),
                reason: format!("{CONFIG_FILE}: {err}"),
            })?;
        let text = read_file(&dir.join(PROMPT_FILE)).await?;
        let actions = load_actions(name, &dir.join(ACTIONS_FILE)).await?;
        debug!(prompt = name, actions = actions.len(), "parsed prompt folder");

        let prompt = self.build_prompt(&text, &config)?;
        Ok(PromptTemplate::new(name, prompt)
            .with_config(config)
            .with_actions(actions))
    }

    fn build_prompt(&self, text: &str, config: &PromptTemplateConfig) -> PromptResult<Prompt> {
        let mut sections: Vec<Arc<dyn PromptSection>> =
            vec![Arc::new(TemplateSection::new(text, MessageRole::System)?)];
        if config.completion.include_history {
            sections.push(Arc::new(ConversationHistory::new(
                self.options.history_variable.clone(),
            )));
        }
        if config.completion.include_images {
            sections.push(Arc::new(
                UserInputMessage::new().with_input_variable(self.options.input_variable.clone()),
            ));
        } else if config.completion.include_input {
            sections.push(Arc::new(UserMessage::new(format!(
                "{{{{${}}}}}",
                self.options.input_variable
            ))?));
        }
        Ok(Prompt::new(sections))
    }
}

async fn load_actions(name: &str, path: &Path) -> PromptResult<Vec<ActionDefinition>> {
    if !tokio::fs::try_exists(path).await.unwrap_or(false) {
        return Ok(Vec::new());
    }
    let text = read_file(path).await?;
    let config_error = |reason: String| PromptError::Config {
        name: name.to_owned(),
        reason: format!("{ACTIONS_FILE}: {reason}"),
    };
    let actions: Vec<ActionDefinition> =
        serde_json::from_str(&text).map_err(|err| config_error(err.to_string()))?;
    for action in &actions {
        ActionDefinition::new(action.name()).map_err(|err| config_error(err.to_string()))?;
    }
    Ok(actions)
}

async fn read_file(path: &Path) -> PromptResult<String> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|source| PromptError::Io {
            path: path.to_path_buf(),
            source,
        })
}
