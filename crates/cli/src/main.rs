use anyhow::Context;
use bookshelf_app::modules::external_books::{self, CatalogClient};
use bookshelf_kernel::settings::Settings;
use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "bookshelf", version, about = "Book catalog service")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP server
    Serve,
    /// Look a book up in the external catalog and print the envelope
    Lookup {
        /// Book name to search for
        name: String,
    },
    /// Print the effective settings as JSON
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings = Settings::load().with_context(|| "failed to load bookshelf settings")?;

    match cli.command {
        Command::Serve => {
            bookshelf_telemetry::init(&settings.telemetry)?;
            bookshelf_app::serve(settings).await
        }
        Command::Lookup { name } => {
            let client = CatalogClient::new(&settings.catalog, settings.lookup_deadline())
                .with_context(|| "failed to build catalog client")?;
            let envelope = match external_books::lookup_by_name(&client, Some(&name)).await {
                Ok(envelope) => envelope,
                Err(err) => err.to_envelope(),
            };
            println!("{}", serde_json::to_string_pretty(&envelope)?);
            Ok(())
        }
        Command::Config => {
            println!("{}", serde_json::to_string_pretty(&settings)?);
            Ok(())
        }
    }
}
