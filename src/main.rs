//! BugBoard CLI - terminal frontend for the BugBoard issue tracker.

use std::io::{self, BufRead, Write};
use std::process;

use bugboard::cli::{
    AttachmentCommands, Cli, Commands, ConfigCommands, IssueCommands, UserCommands,
};
use bugboard::commands::{self, Context, Message, Output};
use bugboard::config::{self, ConfigOverrides, OutputFormat};
use bugboard::models::{IssueDraft, IssueUpdate};
use bugboard::session::SessionStore;
use bugboard::views::ListRoute;
use bugboard::views::detail::ConfirmPrompt;
use bugboard::views::users::{ActivityFilter, NewUserForm};
use clap::Parser;

/// Environment variable holding the log filter (e.g. `debug`, `bugboard=trace`).
const LOG_ENV: &str = "BUGBOARD_LOG";

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env(LOG_ENV)
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    init_tracing();
    let cli = Cli::parse();
    let mut human = cli.human_readable;

    let ctx = match build_context(&cli) {
        Ok(ctx) => ctx,
        Err(e) => fail(&e, human),
    };
    if *ctx.config().output_format() == OutputFormat::Human {
        human = true;
    }

    if let Err(e) = run_command(cli.command, &ctx, human) {
        fail(&e, human);
    }
}

fn build_context(cli: &Cli) -> Result<Context, bugboard::Error> {
    let mut overrides = ConfigOverrides::new();
    if let Some(ref url) = cli.api_url {
        overrides = overrides.with_api_url(url);
    }
    if cli.human_readable {
        overrides = overrides.with_output_format(OutputFormat::Human);
    }
    let config_dir = config::config_dir()?;
    let resolved = config::resolve_config(&config_dir, &overrides)?;
    let store = SessionStore::open_default()?;
    Ok(Context::new(store, config_dir, resolved))
}

fn fail(error: &bugboard::Error, human: bool) -> ! {
    if human {
        eprintln!("Error: {}", error);
    } else {
        eprintln!("{}", serde_json::json!({ "error": error.to_string() }));
    }
    process::exit(1);
}

fn run_command(command: Commands, ctx: &Context, human: bool) -> Result<(), bugboard::Error> {
    match command {
        Commands::Login { email, password } => {
            let password = match password {
                Some(p) => p,
                None => read_line("Password: ")?,
            };
            output(&commands::login(ctx, &email, &password)?, human);
        }
        Commands::Logout => output(&commands::logout(ctx)?, human),
        Commands::Whoami => output(&commands::whoami(ctx)?, human),
        Commands::RecoverPassword { email } => {
            output(&commands::recover_password(ctx, &email)?, human)
        }
        Commands::Dashboard => output(&commands::dashboard(ctx)?, human),
        Commands::Issue { command } => run_issue(command, ctx, human)?,
        Commands::Attachment { command } => run_attachment(command, ctx, human)?,
        Commands::User { command } => run_user(command, ctx, human)?,
        Commands::Config { command } => match command {
            ConfigCommands::Show => output(&commands::config_show(ctx)?, human),
            ConfigCommands::Set { key, value } => {
                output(&commands::config_set(ctx, &key, &value)?, human)
            }
            ConfigCommands::Sidebar { state } => {
                let open = state.map(|s| s == "open");
                output(&commands::config_sidebar(ctx, open)?, human);
            }
        },
    }

    Ok(())
}

fn run_issue(command: IssueCommands, ctx: &Context, human: bool) -> Result<(), bugboard::Error> {
    match command {
        IssueCommands::List { filter } => output(
            &commands::issue_list(ctx, ListRoute::Active, filter.into_filter(false))?,
            human,
        ),
        IssueCommands::Archived { filter } => output(
            &commands::issue_list(ctx, ListRoute::Archived, filter.into_filter(true))?,
            human,
        ),
        IssueCommands::Show { id, from } => {
            let from = from.map(|f| {
                if f == "archived" {
                    ListRoute::Archived
                } else {
                    ListRoute::Active
                }
            });
            output(&commands::issue_show(ctx, id, from)?, human);
        }
        IssueCommands::Create {
            title,
            description,
            issue_type,
            priority,
            attach,
        } => {
            let draft = IssueDraft {
                title,
                description,
                issue_type: Some(issue_type),
                priority,
            };
            output(&commands::issue_create(ctx, draft, &attach)?, human);
        }
        IssueCommands::Update {
            id,
            title,
            description,
            issue_type,
            priority,
            status,
        } => {
            let update = IssueUpdate {
                title,
                description,
                issue_type,
                priority,
                status,
            };
            output(&commands::issue_update(ctx, id, update)?, human);
        }
        IssueCommands::Archive { id, yes } => {
            let mut confirm = confirmer(yes);
            output(&commands::issue_archive(ctx, id, &mut confirm)?, human);
        }
        IssueCommands::Unarchive { id, yes } => {
            let mut confirm = confirmer(yes);
            output(&commands::issue_unarchive(ctx, id, &mut confirm)?, human);
        }
        IssueCommands::Delete { id, yes } => {
            let mut confirm = confirmer(yes);
            output(&commands::issue_delete(ctx, id, &mut confirm)?, human);
        }
        IssueCommands::Stats => output(&commands::issue_stats(ctx)?, human),
        IssueCommands::Search { term } => output(&commands::issue_search(ctx, &term)?, human),
    }
    Ok(())
}

fn run_attachment(
    command: AttachmentCommands,
    ctx: &Context,
    human: bool,
) -> Result<(), bugboard::Error> {
    match command {
        AttachmentCommands::List { issue } => {
            output(&commands::attachment_list(ctx, issue)?, human)
        }
        AttachmentCommands::Upload { issue, files } => {
            output(&commands::attachment_upload(ctx, issue, &files)?, human)
        }
        AttachmentCommands::Download {
            issue,
            attachment,
            output: dir,
        } => output(
            &commands::attachment_download(ctx, issue, attachment, &dir)?,
            human,
        ),
        AttachmentCommands::Delete {
            issue,
            attachment,
            yes,
        } => {
            let mut confirm = confirmer(yes);
            output(
                &commands::attachment_delete(ctx, issue, attachment, &mut confirm)?,
                human,
            );
        }
        AttachmentCommands::Count { issue } => {
            output(&commands::attachment_count(ctx, issue)?, human)
        }
        AttachmentCommands::Size { issue } => output(&commands::attachment_size(ctx, issue)?, human),
    }
    Ok(())
}

fn run_user(command: UserCommands, ctx: &Context, human: bool) -> Result<(), bugboard::Error> {
    match command {
        UserCommands::List { name, status } => {
            let activity = ActivityFilter::parse(&status).unwrap_or_default();
            output(&commands::user_list(ctx, name, activity)?, human);
        }
        UserCommands::Create {
            name,
            surname,
            role,
            password,
        } => {
            let (password, confirmation) = match password {
                Some(p) => (p.clone(), p),
                None => (
                    read_line("Password: ")?,
                    read_line("Confirm password: ")?,
                ),
            };
            let form = NewUserForm {
                name,
                surname,
                password,
                confirmation,
                role,
            };
            output(&commands::user_create(ctx, &form)?, human);
        }
        UserCommands::Role { id, role } => output(&commands::user_role(ctx, id, role)?, human),
        UserCommands::Activate { id, yes } => set_active(ctx, id, true, yes, human)?,
        UserCommands::Deactivate { id, yes } => set_active(ctx, id, false, yes, human)?,
        UserCommands::Passwd => {
            let password = read_line("New password: ")?;
            let confirmation = read_line("Confirm new password: ")?;
            output(&commands::user_passwd(ctx, &password, &confirmation)?, human);
        }
    }
    Ok(())
}

fn set_active(
    ctx: &Context,
    id: u64,
    active: bool,
    yes: bool,
    human: bool,
) -> Result<(), bugboard::Error> {
    let mut confirm = confirmer(yes);
    match commands::user_set_active(ctx, id, active, &mut confirm)? {
        Some(result) => output(&result, human),
        None => output(&Message::cancelled(), human),
    }
    Ok(())
}

/// Confirmation callback: always yes with `--yes`, otherwise asks on stderr.
fn confirmer(yes: bool) -> impl FnMut(&ConfirmPrompt) -> bool {
    move |prompt: &ConfirmPrompt| yes || ask(prompt)
}

fn ask(prompt: &ConfirmPrompt) -> bool {
    eprint!("{}: {} [y/N] ", prompt.title, prompt.message);
    io::stderr().flush().ok();
    let mut answer = String::new();
    if io::stdin().lock().read_line(&mut answer).is_err() {
        return false;
    }
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

fn read_line(prompt: &str) -> Result<String, bugboard::Error> {
    eprint!("{}", prompt);
    io::stderr().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

/// Print output in JSON or human-readable format.
fn output<T: Output>(result: &T, human: bool) {
    if human {
        println!("{}", result.to_human());
    } else {
        println!("{}", result.to_json());
    }
}

