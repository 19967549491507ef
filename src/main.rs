use clap::{Parser, Subcommand};

use fortune_bot::application::messaging::MessageParser;
use fortune_bot::application::services::CommandService;
use fortune_bot::domain::entities::User;
use fortune_bot::domain::traits::Bot;
use fortune_bot::infrastructure::adapters::console::ConsoleAdapter;
use fortune_bot::infrastructure::config::Config;
use fortune_bot::infrastructure::database::FortuneStore;
use fortune_bot::plugin::FortunePlugin;

#[derive(Parser)]
#[command(name = "fortune-bot")]
#[command(about = "Daily fortune draw plugin with a console dev harness", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, default_value = "config.yaml")]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the bot in console dev mode
    Run,
    /// Show version
    Version,
    /// Generate default config
    InitConfig,
    /// Add a fortune text to the database
    Seed {
        /// The fortune text to insert
        text: String,
    },
}

fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run => {
            run_bot(cli.config);
        }
        Commands::Version => {
            println!("fortune-bot v{}", env!("CARGO_PKG_VERSION"));
        }
        Commands::InitConfig => {
            init_config(cli.config);
        }
        Commands::Seed { text } => {
            seed_fortune(cli.config, &text);
        }
    }
}

fn load_config(config_path: &str) -> Config {
    if std::path::Path::new(config_path).exists() {
        Config::load(config_path).unwrap_or_else(|e| {
            tracing::warn!("Failed to load config: {}, using defaults", e);
            Config::load_env()
        })
    } else {
        Config::load_env()
    }
}

fn run_bot(config_path: String) {
    let config = load_config(&config_path);

    tracing::info!("Starting fortune-bot: {}", config.bot.name);

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!("Failed to start runtime: {}", e);
            return;
        }
    };

    rt.block_on(async {
        let mut plugin = match FortunePlugin::new(&config.fortune) {
            Ok(plugin) => plugin,
            Err(e) => {
                tracing::error!("Failed to open fortune store: {}", e);
                return;
            }
        };

        let mut commands = CommandService::new(&config.bot.prefix);
        commands.register_defaults();
        plugin.register_commands(&mut commands, &config.fortune.trigger);

        let bot = ConsoleAdapter::new(&config.bot.name);
        run_console_bot(&bot, &commands, &config).await;

        plugin.terminate().await;
    });
}

async fn run_console_bot(bot: &ConsoleAdapter, commands: &CommandService, config: &Config) {
    if let Err(e) = bot.start().await {
        tracing::error!("Failed to start console bot: {}", e);
        return;
    }

    println!("{}", commands.get_help(None));
    println!("Type '<user_id> <text>' lines ('quit' to exit):");

    let parser = MessageParser::new(&config.bot.prefix);

    loop {
        let Some(line) = bot.read_line("> ").await else {
            break;
        };
        if line.is_empty() {
            continue;
        }
        if line == "quit" || line == "exit" {
            break;
        }

        // First word is the pretend user id, the rest is the message.
        let (user_id, text) = match line.split_once(' ') {
            Some((user_id, text)) => (user_id.to_string(), text.to_string()),
            None => ("console".to_string(), line),
        };

        let msg = parser.parse(&user_id, text, Some(User::new(&user_id)));
        match commands.handle(&msg) {
            Ok(Some(reply)) => {
                if let Err(e) = bot.send_message(&user_id, &reply).await {
                    tracing::error!("Failed to send message: {}", e);
                }
            }
            Ok(None) => {}
            Err(e) => {
                let _ = bot.send_message(&user_id, &format!("Error: {}", e)).await;
            }
        }
    }
}

fn init_config(config_path: String) {
    let config = Config::default();
    match config.save(&config_path) {
        Ok(()) => println!("Wrote default config to {}", config_path),
        Err(e) => tracing::error!("Failed to write config: {}", e),
    }
}

fn seed_fortune(config_path: String, text: &str) {
    let config = load_config(&config_path);
    let store = match FortuneStore::new(&config.fortune.database) {
        Ok(store) => store,
        Err(e) => {
            tracing::error!("Failed to open fortune store: {}", e);
            return;
        }
    };
    match store.add_fortune(text) {
        Ok(id) => {
            let total = store.count().unwrap_or(-1);
            println!("Added fortune #{} ({} total)", id, total);
        }
        Err(e) => tracing::error!("Failed to add fortune: {}", e),
    }
}
