use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use reqwest::Client;
use std::path::PathBuf;
use ticket_priority::{
    config::Config,
    maintenance::{train_maintenance_model, MaintenancePredictor, DEFAULT_ISSUE},
    models::TicketFeatures,
    observability::init_tracing,
    priority::{train_priority_model, PriorityService, ServiceSettings},
};

#[derive(Parser)]
#[command(name = "ticket-priority-cli")]
#[command(about = "Train and query ticket priority models", long_about = None, version)]
struct Cli {
    /// Configuration file layered over the built-in defaults
    #[arg(short, long, global = true, env = "CONFIG_PATH")]
    config: Option<PathBuf>,

    /// Server used by the remote commands
    #[arg(short, long, global = true, default_value = "http://localhost:8000")]
    endpoint: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct TicketArgs {
    #[arg(long)]
    text: String,

    #[arg(long)]
    domain: String,

    #[arg(long, default_value = "0")]
    vip: i64,

    #[arg(long, allow_hyphen_values = true)]
    spend30d: f64,

    #[arg(long, allow_hyphen_values = true)]
    eta_to_sla_min: f64,
}

impl From<TicketArgs> for TicketFeatures {
    fn from(args: TicketArgs) -> Self {
        Self {
            text: args.text,
            domain: args.domain,
            vip: args.vip,
            spend30d: args.spend30d,
            eta_to_sla_min: args.eta_to_sla_min,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Train the mixed-feature priority model and write its artifact
    TrainPriority,

    /// Train the maintenance issue model and write its bundle
    TrainMaintenance {
        /// Also export the classifier and vectorizer as separate artifacts
        #[arg(long)]
        split: bool,
    },

    /// Classify a maintenance issue with the trained bundle
    PredictMaintenance {
        #[arg(value_name = "TEXT")]
        text: Option<String>,

        /// Load the split classifier and vectorizer instead of the bundle
        #[arg(long)]
        components: bool,
    },

    /// Score a ticket with the local priority model
    Predict(TicketArgs),

    /// Score a ticket through a running server
    RemotePredict(TicketArgs),

    /// Check server health
    Health,
}

/// Pretty-print a JSON response body; extractor rejections come back as plain text
fn render_body(body: &str) -> anyhow::Result<String> {
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(json) => Ok(serde_json::to_string_pretty(&json)?),
        Err(_) => Ok(body.trim_end().to_string()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::load_from(cli.config.as_deref()).context("Failed to load configuration")?;
    // A second subscriber cannot be installed; ignore in that case
    let _ = init_tracing(&config.observability);

    match cli.command {
        Commands::TrainPriority => {
            let summary = train_priority_model(&config.priority)?;
            println!("{}", summary.report);
            println!(
                "Trained {} on {} rows, evaluated on {} (run {})",
                summary.model_name, summary.n_train, summary.n_test, summary.run_id
            );
            if !summary.converged {
                println!("Warning: optimizer stopped at max_iter without converging");
            }
            println!("Model written to {}", summary.artifact_path.display());
        }

        Commands::TrainMaintenance { split } => {
            let summary = train_maintenance_model(&config.maintenance, split)?;
            println!("{}", summary.report);
            println!("Accuracy: {:.4}", summary.report.accuracy);
            println!(
                "Trained on {} rows, evaluated on {}, vocabulary {} terms (run {})",
                summary.n_train, summary.n_test, summary.vocab_size, summary.run_id
            );
            for path in &summary.artifacts {
                println!("Wrote {}", path.display());
            }
        }

        Commands::PredictMaintenance { text, components } => {
            let m = &config.maintenance;
            let predictor = if components {
                MaintenancePredictor::load_components(&m.classifier_path, &m.vectorizer_path)?
            } else {
                MaintenancePredictor::load(&m.bundle_path)?
            };

            let text = text.unwrap_or_else(|| DEFAULT_ISSUE.to_string());
            let priority = predictor.predict_priority(&text)?;
            println!("Text: {}", text);
            println!("Cleaned: {}", predictor.clean(&text));
            println!("Predicted priority: {}", priority);
        }

        Commands::Predict(args) => {
            let settings = ServiceSettings::from(&config.priority);
            let service = PriorityService::load(&config.priority.model_path, settings)?;
            let prediction = service.predict(&TicketFeatures::from(args))?;
            println!("{}", serde_json::to_string_pretty(&prediction)?);
        }

        Commands::RemotePredict(args) => {
            let client = Client::new();
            let response = client
                .post(format!("{}/predict", cli.endpoint))
                .json(&TicketFeatures::from(args))
                .send()
                .await?;

            let status = response.status();
            let body = response.text().await?;
            println!("{}", render_body(&body)?);
            if !status.is_success() {
                anyhow::bail!("server answered {}", status);
            }
        }

        Commands::Health => {
            let client = Client::new();
            let response = client
                .get(format!("{}/health", cli.endpoint))
                .send()
                .await?;

            println!("{}", render_body(&response.text().await?)?);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_json_body() {
        let rendered = render_body(r#"{"priority":"high","score":87}"#).unwrap();
        assert!(rendered.contains("\"priority\": \"high\""));
        assert!(rendered.contains('\n'));
    }

    #[test]
    fn test_render_plain_text_rejection() {
        let body = "Failed to deserialize the JSON body into the target type: missing field `domain`\n";
        assert_eq!(
            render_body(body).unwrap(),
            "Failed to deserialize the JSON body into the target type: missing field `domain`"
        );
    }
}
