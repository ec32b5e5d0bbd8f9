use anyhow::Result;
use clap::Parser;
use conversa::cache::{CacheStore, InMemoryCache};
use conversa::cli::{Cli, Commands};
use conversa::llm::OpenAiClient;
use conversa::memory::{RetentionPolicy, StrategySelector};
use conversa::session::{ChatRequest, SessionOrchestrator, StaticSystemPrompt};
use conversa::snapshot::SnapshotManager;
use conversa::store::{ConversationStore, NullDurableStore};
use conversa::{utils, ChatResponse, Settings};
use std::io::Write as _;
use std::sync::Arc;
use tokio::io::{self, AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

const SYSTEM_PROMPT: &str = "You are a helpful, concise assistant.";

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::new()?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(settings.logging.level.clone())),
        )
        .init();

    let cli = Cli::parse();
    let orchestrator = build_orchestrator(&settings)?;

    match cli.command {
        Commands::Chat {
            prompt,
            owner,
            conversation,
            model,
            policy,
        } => {
            let policy: RetentionPolicy = policy.parse()?;
            handle_chat(&orchestrator, prompt, owner, conversation, model, policy).await
        }
        Commands::Interactive {
            owner,
            model,
            policy,
        } => {
            let policy: RetentionPolicy = policy.parse()?;
            handle_interactive(&orchestrator, owner, model, policy).await
        }
    }
}

fn build_orchestrator(settings: &Settings) -> Result<SessionOrchestrator> {
    let api_key = Settings::api_key()?;
    let cache: Arc<dyn CacheStore> = Arc::new(InMemoryCache::new());
    let store = Arc::new(ConversationStore::new(
        cache.clone(),
        Arc::new(NullDurableStore),
        settings.cache.conversation_ttl(),
    ));

    Ok(SessionOrchestrator::new(
        store.clone(),
        StrategySelector::new(store, settings.retention.window_size),
        SnapshotManager::new(cache, settings.cache.snapshot_ttl()),
        Arc::new(OpenAiClient::new(api_key, settings.llm.clone())),
        Arc::new(StaticSystemPrompt::new(SYSTEM_PROMPT)),
        settings.llm.model.clone(),
    ))
}

async fn handle_chat(
    orchestrator: &SessionOrchestrator,
    prompt: String,
    owner: String,
    conversation: Option<String>,
    model: Option<String>,
    policy: RetentionPolicy,
) -> Result<()> {
    utils::print_info("Sending request...");

    let response = orchestrator
        .process_message(
            ChatRequest {
                prompt,
                owner_id: owner,
                model_id: model,
            },
            conversation.as_deref(),
            policy,
        )
        .await?;

    println!("\n{}", response.response);
    print_metadata(&response);
    Ok(())
}

async fn handle_interactive(
    orchestrator: &SessionOrchestrator,
    owner: String,
    model: Option<String>,
    policy: RetentionPolicy,
) -> Result<()> {
    utils::print_header("Interactive Mode");
    utils::print_info("Type your messages (/history, /restore, /clear, /quit)\n");

    let mut conversation_id: Option<String> = None;
    let stdin = io::stdin();
    let mut reader = BufReader::new(stdin);

    loop {
        utils::print_prompt("You: ");
        std::io::stdout().flush().ok();

        let mut input = String::new();
        if reader.read_line(&mut input).await? == 0 {
            break;
        }

        let input = input.trim();
        if input.is_empty() {
            continue;
        }

        match input {
            "/quit" => break,
            "/history" => {
                show_history(orchestrator, conversation_id.as_deref()).await?;
            }
            "/restore" => {
                show_snapshot(orchestrator, conversation_id.as_deref()).await;
            }
            "/clear" => {
                if let Some(id) = conversation_id.as_deref() {
                    orchestrator.clear(id, policy).await?;
                    utils::print_success("History cleared under the active policy");
                } else {
                    utils::print_info("No active conversation");
                }
            }
            prompt => {
                let response = orchestrator
                    .process_message(
                        ChatRequest {
                            prompt: prompt.to_string(),
                            owner_id: owner.clone(),
                            model_id: model.clone(),
                        },
                        conversation_id.as_deref(),
                        policy,
                    )
                    .await;

                match response {
                    Ok(response) => {
                        println!("\nAssistant: {}\n", response.response);
                        conversation_id = Some(response.conversation_id);
                    }
                    Err(e) => utils::print_error(&format!("Error: {e}")),
                }
            }
        }
    }

    utils::print_info("Goodbye!");
    Ok(())
}

async fn show_history(
    orchestrator: &SessionOrchestrator,
    conversation_id: Option<&str>,
) -> Result<()> {
    let Some(id) = conversation_id else {
        utils::print_info("No active conversation");
        return Ok(());
    };

    match orchestrator.history(id).await? {
        Some(conversation) => {
            utils::print_header(&format!("Transcript {}", conversation.id));
            for message in &conversation.messages {
                println!("[{:?}] {}", message.role, message.content);
            }
        }
        None => utils::print_info("Conversation has expired"),
    }
    Ok(())
}

async fn show_snapshot(orchestrator: &SessionOrchestrator, conversation_id: Option<&str>) {
    let Some(id) = conversation_id else {
        utils::print_info("No active conversation");
        return;
    };

    match orchestrator.restore_snapshot(id).await {
        Some(snapshot) => {
            utils::print_success(&format!(
                "Snapshot of '{}' taken at {} ({} messages, model {})",
                snapshot.conversation_id,
                snapshot.taken_at,
                snapshot.messages.len(),
                snapshot.model_id
            ));
        }
        None => utils::print_info("No snapshot stored"),
    }
}

fn print_metadata(response: &ChatResponse) {
    utils::print_info(&format!(
        "\n[conversation {} | model {} | {} ms{}]",
        response.conversation_id,
        response.metadata.model_id,
        response.metadata.response_time_ms,
        response
            .metadata
            .tokens_used
            .map(|t| format!(" | {t} tokens"))
            .unwrap_or_default()
    ));
}
