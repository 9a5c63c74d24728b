use std::io::Write;
use std::process::ExitCode;

use tokio::io::{AsyncBufReadExt, BufReader};

use vimedical_lib::config::{self, ServiceConfig};
use vimedical_lib::dialogue::{DialogueService, TurnStatus};

fn main() -> ExitCode {
    vimedical_lib::init_tracing();
    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let config = match ServiceConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    // Blocking HTTP clients are built and dropped outside the runtime
    let service = match DialogueService::from_config(&config) {
        Ok(service) => service,
        Err(e) => {
            tracing::error!(error = %e, "Failed to initialize dialogue service");
            return ExitCode::FAILURE;
        }
    };

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            tracing::error!(error = %e, "Failed to start async runtime");
            return ExitCode::FAILURE;
        }
    };

    let code = runtime.block_on(repl(&service));
    drop(runtime);
    code
}

/// Read one message per line from stdin and answer each as a turn of a
/// single session.
async fn repl(service: &DialogueService) -> ExitCode {
    let session_id = match service.new_session() {
        Ok(id) => id,
        Err(e) => {
            tracing::error!(error = %e, "Failed to create session");
            return ExitCode::FAILURE;
        }
    };
    println!("Phiên {session_id}. Nhập câu hỏi (Ctrl-D để thoát).");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        let _ = std::io::stdout().flush();

        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                tracing::error!(error = %e, "Failed to read stdin");
                return ExitCode::FAILURE;
            }
        };
        let message = line.trim();
        if message.is_empty() {
            continue;
        }

        match service.handle_turn(&session_id, message).await {
            Ok(reply) => {
                println!("[{}] {}", reply.timestamp, reply.response);
                if !reply.possible_diseases.is_empty() {
                    println!("  Bệnh có thể: {}", reply.possible_diseases.join(", "));
                }
                if !reply.symptoms.is_empty() && reply.status != TurnStatus::Failed {
                    println!("  Triệu chứng: {}", reply.symptoms);
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "Session storage failed");
                return ExitCode::FAILURE;
            }
        }
    }

    ExitCode::SUCCESS
}
