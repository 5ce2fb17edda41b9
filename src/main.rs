use anyhow::Result;
use clap::{Parser, Subcommand};
use grit::areas::repository::Repository;
use grit::commands::porcelain::push::PushOptions;
use std::time::Duration;

#[derive(Parser)]
#[command(
    name = "grit",
    version = "0.1.0",
    about = "A minimal version-control engine with smart-HTTP push",
    long_about = "grit is a small content-addressable version-control engine. \
    It stores blobs, trees and commits in a local object database, \
    and can push branch history to a smart-HTTP remote as a pack.",
    help_template = r"
{name} {version} - {about}

USAGE:
    {usage}

OPTIONS:
    {all-args}
",
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(
        name = "init",
        about = "Initialize a new repository",
        long_about = "This command initializes a new repository in the current directory or at the specified path."
    )]
    Init {
        #[arg(index = 1, help = "The path to the repository")]
        path: Option<String>,
    },
    #[command(
        name = "cat-file",
        about = "Print the content of an object",
        long_about = "This command prints the content of an object in the repository. \
        It requires the SHA of the object to be specified."
    )]
    CatFile {
        #[arg(short = 't', long = "type", help = "Print the object's type instead of its content")]
        show_type: bool,
        #[arg(index = 1, help = "The object SHA to print")]
        sha: String,
    },
    #[command(
        name = "hash-object",
        about = "Hash an object and optionally write it to the object database",
        long_about = "This command hashes an object file and can write it to the object database. \
        It requires the path to the file to be specified."
    )]
    HashObject {
        #[arg(short, long, required = false, help = "Write the object to the object database")]
        write: bool,
        #[arg(index = 1)]
        file: String,
    },
    #[command(
        name = "add",
        about = "Stage files for the next commit",
        long_about = "This command stages the specified files or directories, \
        storing their content as blobs and recording them in the index."
    )]
    Add {
        #[arg(index = 1, required = true, help = "Files or directories to stage")]
        paths: Vec<String>,
    },
    #[command(
        name = "commit",
        about = "Create a new commit with the specified message",
        long_about = "This command creates a new commit in the repository with the specified commit message."
    )]
    Commit {
        #[arg(short, long, help = "The commit message")]
        message: String,
    },
    #[command(
        name = "branch",
        about = "List, create, or delete branches",
        long_about = "Without arguments this lists branches. With a name it creates \
        a branch at the current HEAD, or deletes it with -d."
    )]
    Branch {
        #[arg(index = 1, help = "The branch name")]
        name: Option<String>,
        #[arg(short, long, help = "Delete the named branch")]
        delete: bool,
    },
    #[command(
        name = "log",
        about = "Show commit history",
        long_about = "This command walks first-parent history from HEAD, newest first."
    )]
    Log {
        #[arg(long, help = "One line per commit")]
        oneline: bool,
    },
    #[command(
        name = "config",
        about = "Get and set repository configuration",
        long_about = "With a key this prints its value, with a key and value it stores \
        the pair, and without arguments it lists all configuration."
    )]
    Config {
        #[arg(index = 1, help = "Dotted configuration key, e.g. remote.origin.url")]
        key: Option<String>,
        #[arg(index = 2, help = "Value to store under the key")]
        value: Option<String>,
    },
    #[command(
        name = "push",
        about = "Push a branch to a smart-HTTP remote",
        long_about = "This command pushes the given branch to a configured remote: it discovers \
        the remote's refs, packs the missing objects, and uploads them with a ref update command."
    )]
    Push {
        #[arg(index = 1, help = "The remote name, e.g. origin")]
        remote: String,
        #[arg(index = 2, help = "The branch to push")]
        branch: String,
        #[arg(short, long, help = "Allow non-fast-forward updates")]
        force: bool,
        #[arg(long, help = "Username for basic authentication")]
        username: Option<String>,
        #[arg(long, help = "Password for basic authentication")]
        password: Option<String>,
        #[arg(long, default_value_t = 30, help = "Network timeout in seconds")]
        timeout: u64,
        #[arg(long, default_value_t = 3, help = "Retry budget for transient network failures")]
        retries: u32,
    },
}

fn open_repository() -> Result<Repository> {
    let pwd = std::env::current_dir()?;
    Repository::new(&pwd.to_string_lossy(), Box::new(std::io::stdout()))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Init { path } => {
            let mut repository = match path {
                Some(path) => {
                    std::fs::create_dir_all(path)?;
                    Repository::new(path, Box::new(std::io::stdout()))?
                }
                None => open_repository()?,
            };

            repository.init().await?
        }
        Commands::CatFile { show_type, sha } => open_repository()?.cat_file(sha, *show_type)?,
        Commands::HashObject { write, file } => open_repository()?.hash_object(file, *write)?,
        Commands::Add { paths } => open_repository()?.add(paths).await?,
        Commands::Commit { message } => open_repository()?.commit(message.as_str()).await?,
        Commands::Branch { name, delete } => {
            open_repository()?.branch(name.as_deref(), *delete)?
        }
        Commands::Log { oneline } => open_repository()?.log(*oneline)?,
        Commands::Config { key, value } => {
            open_repository()?
                .config(key.as_deref(), value.as_deref())
                .await?
        }
        Commands::Push {
            remote,
            branch,
            force,
            username,
            password,
            timeout,
            retries,
        } => {
            let opts = PushOptions {
                force: *force,
                username: username.clone(),
                password: password.clone(),
                timeout: Duration::from_secs(*timeout),
                retries: *retries,
            };
            open_repository()?.push(remote, branch, &opts).await?
        }
    }

    Ok(())
}
