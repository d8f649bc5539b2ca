mod board;
mod capabilities;
mod db;
mod error;
mod filters;
mod forms;
mod jobs;
mod models;
mod notifications;
mod repository;
mod session;
mod tui;
mod wallet;

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::rc::Rc;
use std::thread;
use std::time::Duration;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use board::{Board, Capabilities};
use capabilities::{LoggingLedger, MockArtifactStore, MockWallet, WalletProvider};
use db::Database;
use filters::{DEFAULT_SALARY_BAND, FilterCriteria, LOCATIONS};
use forms::{ApplicationForm, JobForm, ResumeFile, SignInForm, SignUpForm};
use jobs::JobStore;
use models::{Application, Decision, Job, JobCategory, NotificationKind};
use repository::KeyValueStore;
use wallet::SIMULATED_CONNECTION;

#[derive(Parser)]
#[command(name = "jobboard")]
#[command(about = "Job board - post jobs, apply with a wallet, track notifications")]
struct Cli {
    /// Database file (defaults to the platform data directory)
    #[arg(long, global = true, env = "JOBBOARD_DB")]
    db: Option<PathBuf>,

    /// Log filter, e.g. "info" or "jobboard=debug"
    #[arg(long, global = true, env = "RUST_LOG", default_value = "warn")]
    log_level: String,

    /// Run as if no wallet were installed
    #[arg(long, global = true)]
    no_wallet: bool,

    /// Wait like a real upload, sign-in or chain call would
    #[arg(long, global = true)]
    pace: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database
    Init {
        /// Start with an empty job catalog instead of the sample postings
        #[arg(long)]
        empty: bool,
    },

    #[command(flatten)]
    Board(BoardCommands),
}

/// Commands that run against an initialized board.
#[derive(Subcommand)]
enum BoardCommands {
    /// Create an account and sign in
    Signup {
        #[arg(short, long)]
        email: String,
        #[arg(short, long)]
        password: String,
        #[arg(short, long)]
        name: String,
    },

    /// Sign in
    Login {
        #[arg(short, long)]
        email: String,
        #[arg(short, long)]
        password: String,
    },

    /// Sign out
    Logout,

    /// Show the signed-in user, wallet and unread notifications
    Whoami,

    /// Manage the wallet connection
    Wallet {
        #[command(subcommand)]
        command: WalletCommands,
    },

    /// Browse and manage job postings
    Jobs {
        #[command(subcommand)]
        command: JobCommands,
    },

    /// Apply for a job
    Apply {
        /// Job ID
        job_id: i64,

        /// Résumé file to upload
        #[arg(short, long)]
        resume: PathBuf,

        /// Cover message
        #[arg(short, long, default_value = "")]
        message: String,
    },

    /// Review applications
    Applications {
        #[command(subcommand)]
        command: ApplicationCommands,
    },

    /// Read and manage notifications
    Notifications {
        #[command(subcommand)]
        command: NotificationCommands,
    },

    /// Show board statistics
    Stats,

    /// Interactive job browser
    Browse {
        #[command(flatten)]
        filters: FilterArgs,
    },
}

#[derive(Subcommand)]
enum WalletCommands {
    /// Connect a wallet
    Connect {
        /// Authorize this address instead of a generated one
        #[arg(long)]
        address: Option<String>,
    },

    /// Disconnect the wallet
    Disconnect,

    /// Show the connection state
    Status,
}

#[derive(Subcommand)]
enum JobCommands {
    /// List jobs
    List {
        #[command(flatten)]
        filters: FilterArgs,

        /// Only open postings
        #[arg(long)]
        open: bool,
    },

    /// Show job details
    Show {
        /// Job ID
        id: i64,
    },

    /// Post a job (requires a connected wallet)
    Post {
        #[arg(long)]
        title: String,
        #[arg(long)]
        company: String,
        #[arg(long)]
        location: String,
        /// Free text, e.g. "120,000 - 150,000 USDC"
        #[arg(long)]
        salary: String,
        #[arg(long)]
        description: String,
        #[arg(long, default_value = "Development")]
        category: JobCategory,
        /// Content id of already uploaded posting details
        #[arg(long)]
        ipfs_hash: Option<String>,
    },

    /// Edit one of your jobs
    Edit {
        /// Job ID
        id: i64,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        company: Option<String>,
        #[arg(long)]
        location: Option<String>,
        #[arg(long)]
        salary: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        category: Option<JobCategory>,
    },

    /// Close one of your jobs to new applications
    Close {
        /// Job ID
        id: i64,
    },

    /// Delete one of your jobs and its applications
    Delete {
        /// Job ID
        id: i64,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// List the jobs you posted
    Mine,

    /// List the categories and locations the filters offer
    Options,
}

#[derive(Subcommand)]
enum ApplicationCommands {
    /// List applications on one of your jobs
    List {
        /// Job ID
        job_id: i64,
    },

    /// List your own applications
    Mine,

    /// Accept a pending application
    Accept {
        /// Application ID
        id: i64,
    },

    /// Reject a pending application
    Reject {
        /// Application ID
        id: i64,
    },
}

#[derive(Subcommand)]
enum NotificationCommands {
    /// List notifications, newest first
    List,

    /// Mark one notification as read
    Read {
        /// Notification ID
        id: String,
    },

    /// Mark every notification as read
    ReadAll,

    /// Delete all notifications
    Clear,
}

#[derive(Args)]
struct FilterArgs {
    /// Match title, company or description
    #[arg(short, long)]
    search: Option<String>,

    /// Category (repeatable)
    #[arg(short, long)]
    category: Vec<JobCategory>,

    /// Location (repeatable)
    #[arg(short, long)]
    location: Vec<String>,

    /// Lower salary bound, in thousands
    #[arg(long)]
    salary_min: Option<u32>,

    /// Upper salary bound, in thousands
    #[arg(long)]
    salary_max: Option<u32>,
}

impl FilterArgs {
    /// Criteria only when some filter was given; otherwise the whole catalog is shown.
    fn criteria(&self) -> Option<FilterCriteria> {
        if self.search.is_none()
            && self.category.is_empty()
            && self.location.is_empty()
            && self.salary_min.is_none()
            && self.salary_max.is_none()
        {
            return None;
        }
        Some(FilterCriteria {
            search_term: self.search.clone().unwrap_or_default(),
            categories: self.category.clone(),
            locations: self.location.clone(),
            salary_range: (
                self.salary_min.unwrap_or(DEFAULT_SALARY_BAND.0),
                self.salary_max.unwrap_or(DEFAULT_SALARY_BAND.1),
            ),
        })
    }
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(io::stderr),
        )
        .init();
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let head: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}

fn pause(enabled: bool, millis: u64) {
    if enabled {
        thread::sleep(Duration::from_millis(millis));
    }
}

fn time_ago(at: DateTime<Utc>) -> String {
    let elapsed = Utc::now().signed_duration_since(at);
    let plural = |n: i64, unit: &str| {
        if n == 1 {
            format!("1 {} ago", unit)
        } else {
            format!("{} {}s ago", n, unit)
        }
    };
    if elapsed.num_minutes() < 1 {
        "just now".to_string()
    } else if elapsed.num_hours() < 1 {
        plural(elapsed.num_minutes(), "minute")
    } else if elapsed.num_days() < 1 {
        plural(elapsed.num_hours(), "hour")
    } else {
        plural(elapsed.num_days(), "day")
    }
}

fn unread_badge(count: usize) -> String {
    if count > 9 {
        "9+".to_string()
    } else {
        count.to_string()
    }
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{} [y/N] ", prompt);
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
}

fn print_job_table<'a>(jobs: impl IntoIterator<Item = &'a Job>, board: &Board) {
    println!(
        "{:<5} {:<7} {:<28} {:<18} {:<18} {:<24} {:>5}",
        "ID", "STATUS", "TITLE", "COMPANY", "LOCATION", "SALARY", "APPS"
    );
    println!("{}", "-".repeat(110));
    for job in jobs {
        println!(
            "{:<5} {:<7} {:<28} {:<18} {:<18} {:<24} {:>5}",
            job.id,
            if job.is_open { "open" } else { "closed" },
            truncate(&job.title, 26),
            truncate(&job.company, 16),
            truncate(&job.location, 16),
            truncate(&job.salary, 22),
            board.jobs.job_applications(job.id).len()
        );
    }
}

fn print_application_table<'a>(applications: impl IntoIterator<Item = &'a Application>) {
    println!(
        "{:<5} {:<6} {:<20} {:<15} {:<10} {:<12} {:<30}",
        "ID", "JOB", "APPLICANT", "WALLET", "STATUS", "APPLIED", "MESSAGE"
    );
    println!("{}", "-".repeat(102));
    for app in applications {
        println!(
            "{:<5} {:<6} {:<20} {:<15} {:<10} {:<12} {:<30}",
            app.id,
            app.job_id,
            truncate(&app.applicant_name, 18),
            wallet::short_address(&app.applicant),
            app.status,
            app.applied_at,
            truncate(&app.message, 28)
        );
    }
}

/// Walks through the wallet popup steps, then installs the mock wallet.
fn simulate_wallet_connection(board: &mut Board, provider: MockWallet, pace: bool) -> Result<()> {
    println!("No wallet extension detected. Simulating the connection flow:");
    let mut elapsed = Duration::ZERO;
    for (at, step) in SIMULATED_CONNECTION {
        if pace {
            thread::sleep(at.saturating_sub(elapsed));
        }
        elapsed = at;
        println!("  [{:>4} ms] {}", at.as_millis(), step);
    }
    board.attach_wallet_provider(Box::new(provider));
    board.connect_wallet()?;
    Ok(())
}

fn init_database(db: &Rc<Database>, empty: bool) -> Result<()> {
    db.init()?;
    if empty {
        JobStore::new(db.clone()).persist()?;
        println!("Job catalog emptied.");
    }
    println!("Database initialized at {}", db.path().display());
    let keys = db.keys()?;
    if !keys.is_empty() {
        println!("Stored keys: {}", keys.join(", "));
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    let db = Rc::new(Database::open(cli.db.as_deref()).context("Failed to open database")?);

    let command = match cli.command {
        Commands::Init { empty } => return init_database(&db, empty),
        Commands::Board(command) => command,
    };

    db.ensure_initialized()?;
    let store: Rc<dyn KeyValueStore> = db.clone();
    let wallet: Option<Box<dyn WalletProvider>> = if cli.no_wallet {
        None
    } else {
        Some(Box::new(MockWallet::new(store.clone())))
    };
    let mut board = Board::open(
        store.clone(),
        Capabilities {
            wallet,
            artifacts: Box::new(MockArtifactStore),
            ledger: Box::new(LoggingLedger),
        },
    )
    .context("Failed to load board state")?;
    let pace = cli.pace;

    match command {
        BoardCommands::Signup {
            email,
            password,
            name,
        } => {
            board.sign_up(&SignUpForm {
                email,
                password,
                name,
            })?;
            if let Some(user) = board.session.current_user() {
                println!("Welcome, {}! You are signed in as {}.", user.name, user.email);
            }
        }

        BoardCommands::Login { email, password } => {
            pause(pace, 1000);
            board.sign_in(&SignInForm { email, password })?;
            if let Some(user) = board.session.current_user() {
                println!("Signed in as {} <{}>.", user.name, user.email);
            }
        }

        BoardCommands::Logout => {
            board.sign_out()?;
            println!("Signed out.");
        }

        BoardCommands::Whoami => {
            match board.session.current_user() {
                Some(user) => {
                    println!("{} <{}>", user.name, user.email);
                    println!("User ID: {}", user.id);
                    println!("Member since: {}", user.created_at.format("%Y-%m-%d"));
                }
                None => println!("Not signed in."),
            }
            match board.wallet.short_address() {
                Some(address) => println!("Wallet: {}", address),
                None => println!("Wallet: not connected"),
            }
            if board.session.current_user().is_some() {
                println!(
                    "Unread notifications: {}",
                    unread_badge(board.notifications.unread_count())
                );
            }
        }

        BoardCommands::Wallet { command } => match command {
            WalletCommands::Connect { address } => {
                let mock = MockWallet::new(store.clone());
                if let Some(address) = &address {
                    mock.authorize(address)?;
                }
                if board.has_wallet_provider() {
                    board.connect_wallet()?;
                } else {
                    simulate_wallet_connection(&mut board, mock, pace)?;
                }
                if let Some(address) = board.wallet.address() {
                    println!("Connected: {}", address);
                }
            }
            WalletCommands::Disconnect => {
                board.disconnect_wallet()?;
                println!("Wallet disconnected.");
            }
            WalletCommands::Status => {
                if !board.has_wallet_provider() {
                    println!("No wallet provider available.");
                }
                match board.wallet.address() {
                    Some(address) if board.wallet.is_connected() => {
                        println!("Connected: {}", address)
                    }
                    _ => println!("Not connected."),
                }
            }
        },

        BoardCommands::Jobs { command } => match command {
            JobCommands::List { filters, open } => {
                let mut jobs: Vec<&Job> = match filters.criteria() {
                    Some(criteria) => criteria.apply(board.jobs.jobs()),
                    None => board.jobs.jobs().iter().collect(),
                };
                if open {
                    jobs.retain(|job| job.is_open);
                }
                if jobs.is_empty() {
                    println!("No jobs found.");
                } else {
                    print_job_table(jobs, &board);
                }
            }

            JobCommands::Show { id } => {
                let Some(job) = board.jobs.job(id) else {
                    println!("Job #{} not found.", id);
                    return Ok(());
                };
                println!("Job #{}", job.id);
                println!("Title: {}", job.title);
                println!("Company: {}", job.company);
                println!("Location: {}", job.location);
                println!("Salary: {}", job.salary);
                println!("Category: {}", job.category);
                println!("Status: {}", if job.is_open { "open" } else { "closed" });
                println!("Employer: {}", wallet::short_address(&job.employer));
                if let Some(posted) = job.posted_at {
                    println!("Posted: {}", posted);
                }
                if let Some(hash) = &job.ipfs_hash {
                    println!("Details: {}", hash);
                }
                println!("\n{}", textwrap::fill(&job.description, 78));

                let is_owner = match (board.session.current_user(), &job.created_by) {
                    (Some(user), Some(creator)) => user.id == *creator,
                    _ => false,
                };
                if is_owner {
                    let applications = board.applications_for(id)?;
                    println!("\nApplications ({}):", applications.len());
                    if !applications.is_empty() {
                        print_application_table(applications);
                    }
                } else if board.session.current_user().is_none() {
                    println!("\nSign in to apply for this job.");
                } else if job.is_open {
                    println!("\nApply with: jobboard apply {} --resume FILE", job.id);
                }
            }

            JobCommands::Post {
                title,
                company,
                location,
                salary,
                description,
                category,
                ipfs_hash,
            } => {
                let form = JobForm {
                    title,
                    company,
                    location,
                    salary,
                    description,
                    category,
                    ipfs_hash,
                };
                if form.ipfs_hash.is_none() {
                    println!("Uploading job details...");
                    pause(pace, 2000);
                }
                let job = board.post_job(form)?;
                pause(pace, 1000);
                println!("Posted job #{}: {}", job.id, job.title);
            }

            JobCommands::Edit {
                id,
                title,
                company,
                location,
                salary,
                description,
                category,
            } => {
                let Some(existing) = board.jobs.job(id) else {
                    bail!("Job #{} not found", id);
                };
                let mut form = JobForm::from_job(existing);
                if let Some(v) = title {
                    form.title = v;
                }
                if let Some(v) = company {
                    form.company = v;
                }
                if let Some(v) = location {
                    form.location = v;
                }
                if let Some(v) = salary {
                    form.salary = v;
                }
                if let Some(v) = description {
                    form.description = v;
                }
                if let Some(v) = category {
                    form.category = v;
                }
                let job = board.edit_job(id, &form)?;
                pause(pace, 1000);
                println!("Updated job #{}: {}", job.id, job.title);
            }

            JobCommands::Close { id } => {
                board.close_job(id)?;
                println!("Closed job #{}.", id);
            }

            JobCommands::Delete { id, yes } => {
                if !yes && !confirm("Are you sure you want to delete this job?")? {
                    println!("Cancelled.");
                    return Ok(());
                }
                let removed = board.delete_job(id)?;
                pause(pace, 1000);
                println!("Deleted job #{} and {} application(s).", id, removed);
            }

            JobCommands::Mine => {
                let Some(user) = board.session.current_user() else {
                    bail!("Please sign in to see your jobs");
                };
                let jobs = board.jobs.user_jobs(&user.id);
                if jobs.is_empty() {
                    println!("You have not posted any jobs.");
                } else {
                    print_job_table(jobs, &board);
                }
            }

            JobCommands::Options => {
                println!("Categories:");
                for category in JobCategory::ALL {
                    println!("  {}", category);
                }
                println!("Locations:");
                for location in LOCATIONS {
                    println!("  {}", location);
                }
                println!(
                    "Salary band: {}k - {}k",
                    DEFAULT_SALARY_BAND.0, DEFAULT_SALARY_BAND.1
                );
            }
        },

        BoardCommands::Apply {
            job_id,
            resume,
            message,
        } => {
            let bytes = std::fs::read(&resume)
                .with_context(|| format!("Failed to read résumé {}", resume.display()))?;
            let name = resume
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "resume".to_string());
            let form = ApplicationForm {
                resume: Some(ResumeFile { name, bytes }),
                message,
            };
            println!("Uploading résumé...");
            pause(pace, 2000);
            let application = board.apply(job_id, &form)?;
            pause(pace, 1000);
            println!("Your application has been submitted successfully!");
            println!(
                "Application #{} (résumé {})",
                application.id, application.resume_ipfs
            );
        }

        BoardCommands::Applications { command } => match command {
            ApplicationCommands::List { job_id } => {
                let applications = board.applications_for(job_id)?;
                if applications.is_empty() {
                    println!("No applications yet.");
                } else {
                    print_application_table(applications);
                }
            }

            ApplicationCommands::Mine => {
                let Some(user) = board.session.current_user() else {
                    bail!("Please sign in to see your applications");
                };
                let applications = board.jobs.user_applications(&user.id);
                if applications.is_empty() {
                    println!("You have not applied to any jobs.");
                } else {
                    println!(
                        "{:<5} {:<30} {:<18} {:<10} {:<12}",
                        "ID", "JOB", "COMPANY", "STATUS", "APPLIED"
                    );
                    println!("{}", "-".repeat(78));
                    for app in applications {
                        let (title, company) = board
                            .jobs
                            .job(app.job_id)
                            .map(|j| (j.title.as_str(), j.company.as_str()))
                            .unwrap_or(("(deleted)", "-"));
                        println!(
                            "{:<5} {:<30} {:<18} {:<10} {:<12}",
                            app.id,
                            truncate(title, 28),
                            truncate(company, 16),
                            app.status,
                            app.applied_at
                        );
                    }
                }
            }

            ApplicationCommands::Accept { id } => {
                let app = board.decide(id, Decision::Accept)?;
                println!("Application #{} {}.", app.id, app.status);
            }

            ApplicationCommands::Reject { id } => {
                let app = board.decide(id, Decision::Reject)?;
                println!("Application #{} {}.", app.id, app.status);
            }
        },

        BoardCommands::Notifications { command } => {
            if board.session.current_user().is_none() {
                bail!("Please sign in to see notifications");
            }
            match command {
                NotificationCommands::List => {
                    let items = board.notifications.notifications();
                    if items.is_empty() {
                        println!("No notifications.");
                        return Ok(());
                    }
                    println!(
                        "Notifications ({} unread)",
                        board.notifications.unread_count()
                    );
                    println!(
                        "{:<10} {:<2} {:<12} {:<30} {:<14}",
                        "ID", "", "TYPE", "TITLE", "WHEN"
                    );
                    println!("{}", "-".repeat(72));
                    for n in items {
                        println!(
                            "{:<10} {:<2} {:<12} {:<30} {:<14}",
                            n.id,
                            if n.read { "" } else { "*" },
                            n.kind,
                            truncate(&n.title, 28),
                            time_ago(n.created_at)
                        );
                        println!("{:<26}{}", "", n.message);
                    }
                }

                NotificationCommands::Read { id } => {
                    if !board.notifications.mark_as_read(&id)? {
                        println!("Notification {} not found.", id);
                        return Ok(());
                    }
                    println!("Marked {} as read.", id);
                    let target = board
                        .notifications
                        .notifications()
                        .iter()
                        .find(|n| n.id == id)
                        .filter(|n| n.kind == NotificationKind::Application)
                        .and_then(|n| n.data.as_ref())
                        .and_then(|d| d.job_id);
                    if let Some(job_id) = target {
                        if let Ok(applications) = board.applications_for(job_id) {
                            println!("\nApplications on job #{}:", job_id);
                            print_application_table(applications);
                        }
                    }
                }

                NotificationCommands::ReadAll => {
                    board.notifications.mark_all_as_read()?;
                    println!("All notifications marked as read.");
                }

                NotificationCommands::Clear => {
                    board.notifications.clear_notifications()?;
                    println!("Notifications cleared.");
                }
            }
        }

        BoardCommands::Stats => {
            let stats = board.jobs.stats();
            println!("Total jobs:            {}", stats.total_jobs);
            println!("Open jobs:             {}", stats.open_jobs);
            println!("Total applications:    {}", stats.total_applications);
            println!("Accepted applications: {}", stats.accepted_applications);
            let pending = board
                .jobs
                .applications()
                .iter()
                .filter(|a| !a.status.is_terminal())
                .count();
            println!("Pending applications:  {}", pending);
        }

        BoardCommands::Browse { filters } => {
            tui::run_browse(&mut board, filters.criteria().as_ref())?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_command_tree_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_init_is_split_from_board_commands() {
        let cli = Cli::try_parse_from(["jobboard", "init", "--empty"]).unwrap();
        assert!(matches!(cli.command, Commands::Init { empty: true }));

        let cli = Cli::try_parse_from(["jobboard", "--pace", "stats"]).unwrap();
        assert!(cli.pace);
        assert!(matches!(cli.command, Commands::Board(BoardCommands::Stats)));

        let cli =
            Cli::try_parse_from(["jobboard", "jobs", "list", "-c", "design", "--open"]).unwrap();
        match cli.command {
            Commands::Board(BoardCommands::Jobs {
                command: JobCommands::List { filters, open },
            }) => {
                assert!(open);
                assert_eq!(filters.criteria().unwrap().categories, vec![JobCategory::Design]);
            }
            _ => panic!("expected jobs list"),
        }
    }

    #[test]
    fn test_no_filter_flags_means_no_criteria() {
        let cli = Cli::try_parse_from(["jobboard", "browse"]).unwrap();
        let Commands::Board(BoardCommands::Browse { filters }) = cli.command else {
            panic!("expected browse");
        };
        assert!(filters.criteria().is_none());
    }
}
