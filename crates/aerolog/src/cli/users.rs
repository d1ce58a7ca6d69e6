//! the `users` subcommand - manage user accounts

use clap::{Args, Subcommand};
use color_eyre::eyre::{Context, Result, bail};

use aerolog_db::{AerologDb, Database};
use aerolog_types::{Config, User, password};

/// database connection arguments shared by admin subcommands.
#[derive(Args, Debug)]
pub struct DbArgs {
    /// database url (sqlite:// or postgres://)
    #[arg(long, env = "AEROLOG_DATABASE_URL")]
    database_url: Option<String>,
}

impl DbArgs {
    /// open the database named on the command line (or the default).
    async fn connect(&self) -> Result<AerologDb> {
        let mut config = Config::default();
        if let Some(url) = &self.database_url {
            config.database = super::serve::parse_database_url(url)?;
        }
        AerologDb::new(&config)
            .await
            .context("failed to connect to database")
    }
}

/// manage user accounts
#[derive(Subcommand, Debug)]
pub enum UsersCommand {
    /// create a new user account
    Create(CreateUserArgs),

    /// list all user accounts
    List(ListUsersArgs),
}

/// create a new user account
#[derive(Args, Debug)]
pub struct CreateUserArgs {
    #[command(flatten)]
    db: DbArgs,

    /// username
    name: String,

    /// email address
    #[arg(long)]
    email: String,

    /// password (hashed before storage)
    #[arg(long)]
    password: String,
}

/// list user accounts
#[derive(Args, Debug)]
pub struct ListUsersArgs {
    #[command(flatten)]
    db: DbArgs,

    /// output format (table, json)
    #[arg(short, long, default_value = "table")]
    output: String,
}

impl UsersCommand {
    /// run the users command
    pub async fn run(self) -> Result<()> {
        match self {
            UsersCommand::Create(args) => create_user(args).await,
            UsersCommand::List(args) => list_users(args).await,
        }
    }
}

async fn create_user(args: CreateUserArgs) -> Result<()> {
    if args.password.len() < 8 {
        bail!("password must be at least 8 characters");
    }

    let db = args.db.connect().await?;

    // check if user with this name already exists
    if let Some(_existing) = db
        .get_user_by_username(&args.name.to_lowercase())
        .await
        .context("failed to check for existing user")?
    {
        bail!("user '{}' already exists", args.name);
    }

    let hash = password::hash(&args.password).context("failed to hash password")?;
    let user = User::new(&args.name, &args.email, hash);

    let created = db
        .create_user(&user)
        .await
        .context("failed to create user")?;

    println!("Created user:");
    println!("  ID:       {}", created.id.0);
    println!("  Username: {}", created.username);
    println!("  Email:    {}", created.email);

    Ok(())
}

async fn list_users(args: ListUsersArgs) -> Result<()> {
    let db = args.db.connect().await?;

    let users = db.list_users().await.context("failed to list users")?;

    if args.output == "json" {
        // the password hash is never serialized
        println!("{}", serde_json::to_string_pretty(&users)?);
        return Ok(());
    }

    // table output
    if users.is_empty() {
        println!("No users found.");
        return Ok(());
    }

    println!("{:<6} {:<32} {:<40}", "ID", "USERNAME", "EMAIL");
    println!("{}", "-".repeat(80));

    for user in users {
        println!("{:<6} {:<32} {:<40}", user.id.0, user.username, user.email);
    }

    Ok(())
}
