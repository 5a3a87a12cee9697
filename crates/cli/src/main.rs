use clap::{Parser, Subcommand};
use kayan_core::constants::DEFAULT_DATABASE_URL;
use kayan_core::{AuthService, CoreConfig, Db, UserService};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "kayan")]
#[command(about = "Kayan appointment system operator CLI")]
#[command(
    long_about = "Kayan appointment system operator CLI.\n\ncreate-user, list-doctors and purge-expired-tokens read JWT_ACCESS_SECRET, JWT_REFRESH_SECRET and BCRYPT_SALT_ROUNDS from the environment or .env."
)]
struct Cli {
    /// SQLite database URL
    #[arg(long, env = "DATABASE_URL", default_value = DEFAULT_DATABASE_URL, global = true)]
    database_url: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply pending schema migrations
    Migrate,
    /// Drop every table and re-create the schema
    ResetDb {
        /// Skip the confirmation guard
        #[arg(long)]
        yes: bool,
    },
    /// Create an account
    CreateUser {
        full_name: String,
        email: String,
        password: String,
        /// patient, doctor or finance
        role: String,
    },
    /// List doctors by name
    ListDoctors,
    /// Delete refresh-token records past their expiry
    PurgeExpiredTokens,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        println!("Use 'kayan --help' for commands");
        return Ok(());
    };

    let db = Db::connect(&cli.database_url).await?;

    match command {
        Commands::Migrate => {
            db.migrate().await?;
            println!("Migrations applied to {}", cli.database_url);
        }
        Commands::ResetDb { yes } => {
            if !yes {
                eprintln!("Refusing to reset {} without --yes", cli.database_url);
                std::process::exit(2);
            }
            db.reset().await?;
            println!("Reset database {}", cli.database_url);
        }
        Commands::CreateUser {
            full_name,
            email,
            password,
            role,
        } => {
            db.migrate().await?;
            let cfg = Arc::new(CoreConfig::from_env()?);
            match UserService::new(db.clone(), cfg)
                .signup(&full_name, &email, &password, &role)
                .await
            {
                Ok(user) => println!("Created {} {} with ID: {}", user.role, user.email, user.id),
                Err(kayan_core::CoreError::Validation(errors)) => {
                    eprintln!("Error creating user:");
                    for (field, messages) in errors.into_map() {
                        for message in messages {
                            eprintln!("  {field}: {message}");
                        }
                    }
                }
                Err(e) => eprintln!("Error creating user: {}", e),
            }
        }
        Commands::ListDoctors => {
            let cfg = Arc::new(CoreConfig::from_env()?);
            let doctors = UserService::new(db.clone(), cfg).list_doctors().await?;
            if doctors.is_empty() {
                println!("No doctors found.");
            } else {
                for doctor in doctors {
                    println!(
                        "ID: {}, Name: {}, Email: {}",
                        doctor.id, doctor.full_name, doctor.email
                    );
                }
            }
        }
        Commands::PurgeExpiredTokens => {
            let cfg = Arc::new(CoreConfig::from_env()?);
            let purged = AuthService::new(db.clone(), cfg).purge_expired().await?;
            println!("Purged {} expired refresh token(s)", purged);
        }
    }

    db.close().await;
    Ok(())
}
