use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use serde_json::json;
use turnkit::actions::{
    ActionRegistry, CollectingChannel, ExecutionStatus, PlanExecutor, STOP_COMMAND,
};
use turnkit::config::RuntimeConfig;
use turnkit::kernel::{TurnKernel, prompt_options};
use turnkit::memory::{Memory, TurnState};
use turnkit::models::{PromptCompletionModel, ScriptedModel};
use turnkit::primitives::{ActionDefinition, CancellationToken, Message, MessageRole};
use turnkit::prompts::{
    AugmentationType, Prompt, PromptManager, PromptTemplate, PromptTemplateConfig, TextSection,
    UserMessage,
};

fn scratch_dir(label: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("turnkit-{label}-{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    dir
}

async fn write_prompt_folder(root: &Path) -> Result<()> {
    let home = root.join("home");
    tokio::fs::create_dir_all(&home).await?;
    tokio::fs::write(
        home.join("config.json"),
        json!({
            "schema": 1.1,
            "description": "Home assistant",
            "completion": {"max_input_tokens": 4000},
            "augmentation": {"augmentation_type": "sequence"}
        })
        .to_string(),
    )
    .await?;
    tokio::fs::write(
        home.join("skprompt.txt"),
        "You are the home assistant for {{$user.name}}.",
    )
    .await?;
    tokio::fs::write(
        home.join("actions.json"),
        json!([{
            "name": "lights_on",
            "description": "Turns on the lights in a room",
            "parameters": {
                "type": "object",
                "properties": {"room": {"type": "string"}},
                "required": ["room"]
            }
        }])
        .to_string(),
    )
    .await?;
    Ok(())
}

fn registry() -> Result<Arc<ActionRegistry<(), TurnState>>> {
    let registry = ActionRegistry::new();
    registry.register_fn("lights_on", |_ctx, state: Arc<TurnState>, parameters, action| async move {
        state
            .set_value("conversation.lit_room", parameters["room"].clone())
            .map_err(|err| turnkit::actions::ActionError::handler(action, err.to_string()))?;
        Ok("ok".to_owned())
    })?;
    registry.register_fn("lights_off", |_ctx, _state, _parameters, _action| async move {
        Ok(STOP_COMMAND.to_owned())
    })?;
    Ok(Arc::new(registry))
}

#[tokio::test]
async fn sequence_turn_repairs_and_dispatches() -> Result<()> {
    let root = scratch_dir("sequence");
    write_prompt_folder(&root).await?;
    let config = RuntimeConfig::from_yaml_str(&format!(
        "prompts_folder: {}\nclient:\n  max_repair_attempts: 2\n",
        root.display()
    ))?;
    let _ = turnkit::telemetry::init(&config.logging);

    let prompts = Arc::new(PromptManager::with_options(prompt_options(&config)));
    let model = Arc::new(ScriptedModel::from_replies([
        r#"{"type":"plan","commands":[{"type":"DO","action":"explode"}]}"#,
        r#"{"type":"plan","commands":[{"type":"DO","action":"lights_on","parameters":{"room":"den"}},{"type":"SAY","response":"The den is lit."}]}"#,
    ]));
    let completion: Arc<dyn PromptCompletionModel> = model.clone();
    let channel = CollectingChannel::new();
    let executor = PlanExecutor::new(registry()?).with_output(channel.clone());
    let kernel = TurnKernel::from_config(&config, completion, prompts, "home", executor);

    let state = Arc::new(TurnState::new());
    state.set_value("user.name", json!("Ada"))?;
    state.set_value("temp.input", json!("light the den"))?;

    let outcome = kernel
        .run(Arc::new(()), Arc::clone(&state), &CancellationToken::new())
        .await?;

    let execution = outcome.execution().expect("plan dispatched");
    assert_eq!(execution.status(), ExecutionStatus::Completed);
    assert_eq!(execution.steps(), 2);
    assert_eq!(state.get_value("conversation.lit_room"), Some(json!("den")));
    assert_eq!(
        channel
            .drain()
            .iter()
            .map(Message::text)
            .collect::<Vec<_>>(),
        vec!["The den is lit.".to_owned()]
    );

    let prompts = model.prompts();
    assert_eq!(prompts.len(), 2);
    assert_eq!(prompts[0][0].text(), "You are the home assistant for Ada.");
    let feedback = prompts[1].last().expect("repair feedback");
    assert_eq!(feedback.role(), MessageRole::User);
    assert!(feedback.text().contains("Unknown action named \"explode\""));

    let history: Vec<Message> = serde_json::from_value(
        state
            .get_value("conversation.history")
            .expect("history written"),
    )?;
    assert_eq!(history.len(), 2);
    assert_eq!(history[0], Message::user("light the den"));
    assert!(history[1].text().contains("lights_on"));
    assert!(!state.has_value("conversation.history-repair"));

    let _ = std::fs::remove_dir_all(&root);
    Ok(())
}

#[tokio::test]
async fn monologue_turn_stops_on_request() -> Result<()> {
    let prompts = PromptManager::new();
    let mut template_config = PromptTemplateConfig::default();
    template_config.augmentation.augmentation_type = AugmentationType::Monologue;
    prompts.add_prompt(
        PromptTemplate::new(
            "chat",
            Prompt::new(vec![
                Arc::new(TextSection::new("You run the house.", MessageRole::System)),
                Arc::new(UserMessage::new("{{$temp.input}}")?),
            ]),
        )
        .with_config(template_config)
        .with_actions(vec![ActionDefinition::new("lights_off")?]),
    )?;

    let model: Arc<dyn PromptCompletionModel> = Arc::new(ScriptedModel::from_replies([
        r#"{"thoughts":{"thought":"dark","reasoning":"asked","plan":"switch off"},"action":{"name":"lights_off"}}"#,
    ]));
    let channel = CollectingChannel::new();
    let executor = PlanExecutor::new(registry()?).with_output(channel.clone());
    let kernel = TurnKernel::from_config(
        &RuntimeConfig::default(),
        model,
        Arc::new(prompts),
        "chat",
        executor,
    );

    let state = Arc::new(TurnState::new());
    state.set_value("temp.input", json!("lights off please"))?;
    let outcome = kernel
        .run(Arc::new(()), state, &CancellationToken::new())
        .await?;

    assert!(outcome.response().is_success());
    let execution = outcome.execution().expect("plan dispatched");
    assert_eq!(execution.status(), ExecutionStatus::Stopped);
    assert_eq!(execution.outputs()[0].action, "lights_off");
    assert!(channel.drain().is_empty());
    Ok(())
}
