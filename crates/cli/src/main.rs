use anyhow::Context;
use biblio_app::Application;
use biblio_authz::Authority;
use biblio_kernel::settings::Settings;
use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "biblio", version, about = "Personal library tracker")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Migrate and serve HTTP (the default)
    Serve,
    /// Apply pending database migrations and exit
    Migrate,
    /// Manage user accounts
    Users {
        #[command(subcommand)]
        action: UserCommand,
    },
    /// Manage roles
    Roles {
        #[command(subcommand)]
        action: RoleCommand,
    },
}

#[derive(Debug, Subcommand)]
enum UserCommand {
    /// Create an active account
    Create {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Allow an account to log in again
    Activate { email: String },
    /// Block an account; its open sessions stop working immediately
    Deactivate { email: String },
    /// Attach a role to an account, creating the role if needed
    AddRole {
        #[arg(long)]
        email: String,
        #[arg(long)]
        role: String,
    },
    /// List an account's roles
    Roles { email: String },
}

#[derive(Debug, Subcommand)]
enum RoleCommand {
    /// Create a role unless it already exists
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        description: Option<String>,
    },
}

impl Command {
    fn name(&self) -> &'static str {
        match self {
            Command::Serve => "serve",
            Command::Migrate => "migrate",
            Command::Users { .. } => "users",
            Command::Roles { .. } => "roles",
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings = Settings::load().with_context(|| "failed to load biblio settings")?;
    biblio_telemetry::init(&settings.telemetry)?;

    let command = cli.command.unwrap_or(Command::Serve);
    tracing::info!(command = command.name(), "running biblio command");

    match command {
        Command::Serve => biblio_app::run(settings).await,
        Command::Migrate => {
            let app = Application::bootstrap(settings).await?;
            let applied = app.migrate().await?;
            println!("applied {applied} migration(s)");
            app.shutdown().await
        }
        Command::Users { action } => {
            with_authority(settings, |authority| async move { run_user(&authority, action).await })
                .await
        }
        Command::Roles { action } => {
            with_authority(settings, |authority| async move { run_role(&authority, action).await })
                .await
        }
    }
}

/// Bootstrap and migrate, run `f`, then close the pool whatever `f` returned.
async fn with_authority<F, Fut>(settings: Settings, f: F) -> anyhow::Result<()>
where
    F: FnOnce(Authority) -> Fut,
    Fut: std::future::Future<Output = anyhow::Result<()>>,
{
    let app = Application::bootstrap(settings).await?;
    app.migrate().await?;
    let authority = Authority::from_pool(app.pool().clone(), &app.settings().auth);

    let outcome = f(authority).await;
    app.shutdown().await?;
    outcome
}

async fn run_user(authority: &Authority, action: UserCommand) -> anyhow::Result<()> {
    match action {
        UserCommand::Create { email, password } => {
            let user = authority.register(&email, &password).await?;
            tracing::info!(user_id = user.id, "user created from the command line");
            println!("created user {} ({})", user.email, user.fs_uniquifier);
        }
        UserCommand::Activate { email } => {
            let user = authority.store().set_active(&email, true).await?;
            tracing::info!(user_id = user.id, "user activated");
            println!("activated {}", user.email);
        }
        UserCommand::Deactivate { email } => {
            let user = authority.store().set_active(&email, false).await?;
            tracing::info!(user_id = user.id, "user deactivated");
            println!("deactivated {}", user.email);
        }
        UserCommand::AddRole { email, role } => {
            if authority.store().add_role_to_user(&email, &role).await? {
                tracing::info!(%role, "role granted");
                println!("granted role {role} to {email}");
            } else {
                println!("{email} already has role {role}");
            }
        }
        UserCommand::Roles { email } => {
            let user = authority
                .store()
                .find_by_email(&email)
                .await?
                .with_context(|| format!("no user with email {email}"))?;
            for role in authority.store().roles_for_user(user.id).await? {
                println!("{}\t{}", role.name, role.description.unwrap_or_default());
            }
        }
    }
    Ok(())
}

async fn run_role(authority: &Authority, action: RoleCommand) -> anyhow::Result<()> {
    match action {
        RoleCommand::Create { name, description } => {
            let role = authority
                .store()
                .find_or_create_role(&name, description.as_deref())
                .await?;
            println!("role {} (id {})", role.name, role.id);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    async fn memory_authority() -> Authority {
        let mut settings = Settings::default();
        settings.database.url = "sqlite::memory:".to_string();
        let app = Application::bootstrap(settings).await.unwrap();
        app.migrate().await.unwrap();
        Authority::from_pool(app.pool().clone(), &app.settings().auth)
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn defaults_to_serve() {
        let cli = Cli::try_parse_from(["biblio"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn parses_user_role_assignment() {
        let cli = Cli::try_parse_from([
            "biblio", "users", "add-role", "--email", "ann@example.com", "--role", "admin",
        ])
        .unwrap();
        match cli.command {
            Some(Command::Users {
                action: UserCommand::AddRole { email, role },
            }) => {
                assert_eq!(email, "ann@example.com");
                assert_eq!(role, "admin");
            }
            other => panic!("unexpected parse: {other:?}"),
        }
    }

    #[tokio::test]
    async fn deactivate_blocks_login() {
        let authority = memory_authority().await;
        run_user(
            &authority,
            UserCommand::Create {
                email: "ann@example.com".to_string(),
                password: "password123".to_string(),
            },
        )
        .await
        .unwrap();

        run_user(
            &authority,
            UserCommand::Deactivate {
                email: "ann@example.com".to_string(),
            },
        )
        .await
        .unwrap();

        assert!(matches!(
            authority.authenticate("ann@example.com", "password123").await,
            Err(biblio_authz::AuthError::Inactive)
        ));
    }

    #[tokio::test]
    async fn unknown_user_is_an_error() {
        let authority = memory_authority().await;
        let outcome = run_user(
            &authority,
            UserCommand::Activate {
                email: "nobody@example.com".to_string(),
            },
        )
        .await;
        assert!(outcome.is_err());
    }

    #[tokio::test]
    async fn roles_are_created_and_granted() {
        let authority = memory_authority().await;
        authority.register("ann@example.com", "password123").await.unwrap();

        run_role(
            &authority,
            RoleCommand::Create {
                name: "admin".to_string(),
                description: Some("Site administrator".to_string()),
            },
        )
        .await
        .unwrap();
        run_user(
            &authority,
            UserCommand::AddRole {
                email: "ann@example.com".to_string(),
                role: "admin".to_string(),
            },
        )
        .await
        .unwrap();

        let user = authority
            .store()
            .find_by_email("ann@example.com")
            .await
            .unwrap()
            .unwrap();
        let roles = authority.store().roles_for_user(user.id).await.unwrap();
        assert_eq!(roles.len(), 1);
        assert_eq!(roles[0].description.as_deref(), Some("Site administrator"));
    }
}
