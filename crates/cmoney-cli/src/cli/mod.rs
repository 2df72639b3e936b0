//! CLI entry and dispatch.

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use clap::Parser;
use cmoney_core::ApiClient;
use cmoney_core::api::categories::CategoryType;
use cmoney_core::commands::CommandBus;
use cmoney_core::config::Config;
use cmoney_core::router::{Navigation, Route, Router};
use cmoney_core::session::{FileSessionStore, SessionManager};

use crate::logging;

mod commands;

#[derive(Parser)]
#[command(name = "cmoney")]
#[command(version)]
#[command(about = "C-Money student finance tracker client")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    #[command(flatten)]
    Client(ClientCommands),
}

/// Commands that run against the API with the stored session.
#[derive(clap::Subcommand)]
enum ClientCommands {
    /// Log in and store the session
    Login {
        /// Username (defaults to the remembered one)
        #[arg(short, long)]
        username: Option<String>,
        /// Remember the username for the next login
        #[arg(long)]
        remember: bool,
        /// Password (read from stdin when omitted)
        #[arg(long, env = "CMONEY_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    /// Clear the stored session
    Logout,
    /// Create an account (password and confirmation read from stdin)
    Register {
        #[arg(short, long)]
        username: String,
        #[arg(short, long)]
        email: String,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        student_id: Option<String>,
    },
    /// Show who is logged in and where requests go
    Status,
    /// Open a view by route path (e.g. `#/budgets`)
    Open {
        #[arg(value_name = "ROUTE")]
        route: String,
    },
    /// Month summary and recent transactions
    Dashboard {
        /// Month as YYYY-MM (default: current month)
        #[arg(short, long)]
        month: Option<String>,
    },
    /// Manage transactions
    Transactions {
        #[command(subcommand)]
        command: TransactionCommands,
    },
    /// Manage categories
    Categories {
        #[command(subcommand)]
        command: CategoryCommands,
    },
    /// Manage budgets
    Budgets {
        #[command(subcommand)]
        command: BudgetCommands,
    },
    /// Show reports
    Reports {
        #[command(subcommand)]
        command: ReportCommands,
    },
    /// Show the account profile
    Profile,
    /// Change the password (old, new and confirmation read from stdin)
    ChangePassword,
}

/// Fields of the add-transaction form.
#[derive(clap::Args, Debug, Clone)]
pub(crate) struct TransactionForm {
    /// Amount (always positive; the category decides income or expense)
    #[arg(short, long)]
    pub amount: f64,
    /// Category ID
    #[arg(short, long)]
    pub category: u64,
    /// Date as YYYY-MM-DD (default: today)
    #[arg(short, long)]
    pub date: Option<NaiveDate>,
    #[arg(long, default_value = "")]
    pub description: String,
}

#[derive(clap::Subcommand)]
enum TransactionCommands {
    /// List transactions
    List {
        #[arg(short, long)]
        category: Option<u64>,
        /// From date (inclusive), YYYY-MM-DD
        #[arg(long)]
        from: Option<NaiveDate>,
        /// To date (inclusive), YYYY-MM-DD
        #[arg(long)]
        to: Option<NaiveDate>,
        #[arg(short, long)]
        limit: Option<u32>,
    },
    /// Add a transaction
    Add {
        #[command(flatten)]
        form: TransactionForm,
    },
    /// Update fields of a transaction
    Update {
        id: u64,
        #[arg(short, long)]
        amount: Option<f64>,
        #[arg(short, long)]
        category: Option<u64>,
        #[arg(short, long)]
        date: Option<NaiveDate>,
        #[arg(long)]
        description: Option<String>,
    },
    /// Delete a transaction
    Delete { id: u64 },
    /// Jump to the transactions view and add one
    QuickAdd {
        #[command(flatten)]
        form: TransactionForm,
    },
}

#[derive(clap::Subcommand)]
enum CategoryCommands {
    /// List categories
    List {
        /// income or expense
        #[arg(short = 't', long = "type")]
        kind: Option<CategoryType>,
    },
    /// Add a category
    Add {
        name: String,
        /// income or expense
        #[arg(short = 't', long = "type")]
        kind: CategoryType,
        #[arg(long)]
        icon: Option<String>,
        #[arg(long)]
        color: Option<String>,
    },
    /// Update fields of a category
    Update {
        id: u64,
        #[arg(long)]
        name: Option<String>,
        #[arg(short = 't', long = "type")]
        kind: Option<CategoryType>,
        #[arg(long)]
        icon: Option<String>,
        #[arg(long)]
        color: Option<String>,
    },
    /// Delete a category
    Delete { id: u64 },
    /// Create the default category set
    InitDefaults,
    /// Usage statistics per category
    Stats,
}

/// Fields of the budget form.
#[derive(clap::Args, Debug, Clone)]
pub(crate) struct BudgetForm {
    /// Month as YYYY-MM (default: current month)
    #[arg(short, long)]
    pub month: Option<String>,
    #[arg(short, long)]
    pub amount: f64,
    /// Expense category ID (omit for the overall budget)
    #[arg(short, long)]
    pub category: Option<u64>,
    /// Alert at this usage percentage
    #[arg(long, default_value_t = cmoney_core::api::budgets::DEFAULT_ALERT_THRESHOLD)]
    pub threshold: u8,
}

#[derive(clap::Subcommand)]
enum BudgetCommands {
    /// List budgets
    List {
        #[arg(short, long)]
        month: Option<String>,
        #[arg(short, long)]
        category: Option<u64>,
        /// Only active (true) or inactive (false) budgets
        #[arg(long)]
        active: Option<bool>,
    },
    /// Add a budget
    Add {
        #[command(flatten)]
        form: BudgetForm,
    },
    /// Replace a budget
    Update {
        id: u64,
        #[command(flatten)]
        form: BudgetForm,
    },
    /// Delete a budget
    Delete { id: u64 },
    /// Copy a budget into the following month
    CopyNext { id: u64 },
    /// Active budgets for the current month
    Current,
    /// Budgets at or over their alert threshold
    Alerts,
}

#[derive(clap::Subcommand)]
enum ReportCommands {
    /// Month summary
    Summary {
        #[arg(short, long)]
        month: Option<String>,
    },
    /// Monthly report with per-category detail
    Monthly {
        #[arg(short, long)]
        month: Option<String>,
    },
    /// Yearly report
    Yearly {
        #[arg(short, long)]
        year: Option<i32>,
    },
    /// Expense breakdown over a date range
    ExpenseAnalysis {
        #[arg(long)]
        start: NaiveDate,
        #[arg(long)]
        end: NaiveDate,
    },
    /// Income and expense trend
    Trend {
        #[arg(short, long, default_value_t = cmoney_core::api::reports::DEFAULT_TREND_MONTHS)]
        months: u32,
    },
}

#[derive(clap::Subcommand)]
enum ConfigCommands {
    /// Show the path to the config file
    Path,
    /// Initialize a default config file (if not present)
    Init,
    /// Print a fresh config generated from defaults
    Generate,
    /// Set the API base URL
    SetUrl {
        #[arg(value_name = "URL")]
        url: String,
    },
}

/// Everything a data command needs: the client, the router and its bus.
pub(crate) struct App {
    pub client: ApiClient,
    pub router: Router,
    pub bus: CommandBus,
}

impl App {
    fn open(config: &Config) -> Result<Self> {
        let store = FileSessionStore::open_default().context("open session")?;
        let session = SessionManager::new(Arc::new(store));
        let client = ApiClient::from_config(config, session.clone())?;
        let bus = CommandBus::new();
        let router = Router::new(session, bus.clone());
        Ok(Self {
            client,
            router,
            bus,
        })
    }

    pub fn session(&self) -> &SessionManager {
        self.client.session()
    }

    /// Enters `route` through the guard, failing when sent to the login view.
    pub fn enter(&mut self, route: Route) -> Result<()> {
        match self.router.go(route) {
            Navigation::Proceed(_) => Ok(()),
            Navigation::Redirect(target) => {
                bail!("Not logged in (redirected to {target}). Run `cmoney login` first.")
            }
        }
    }
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load().context("load config")?;
    let _log_guard = logging::init(&config.logging)?;

    // one tokio runtime for everything
    let rt = tokio::runtime::Runtime::new().context("create tokio runtime")?;
    rt.block_on(async move { dispatch(cli.command, config).await })
}

async fn dispatch(command: Commands, config: Config) -> Result<()> {
    match command {
        Commands::Config { command } => match command {
            ConfigCommands::Path => {
                commands::config::path();
                Ok(())
            }
            ConfigCommands::Init => commands::config::init(),
            ConfigCommands::Generate => commands::config::generate(),
            ConfigCommands::SetUrl { url } => commands::config::set_url(&url),
        },
        Commands::Client(command) => {
            let mut app = App::open(&config)?;
            dispatch_client(&mut app, command).await
        }
    }
}

async fn dispatch_client(app: &mut App, command: ClientCommands) -> Result<()> {
    match command {
        ClientCommands::Login {
            username,
            remember,
            password,
        } => commands::auth::login(app, username, password, remember).await,
        ClientCommands::Logout => commands::auth::logout(app),
        ClientCommands::Register {
            username,
            email,
            phone,
            student_id,
        } => commands::auth::register(app, username, email, phone, student_id).await,
        ClientCommands::Status => commands::auth::status(app),
        ClientCommands::Open { route } => commands::open::run(app, &route).await,
        ClientCommands::Dashboard { month } => commands::dashboard::run(app, month.as_deref()).await,
        ClientCommands::Profile => commands::auth::profile(app).await,
        ClientCommands::ChangePassword => commands::auth::change_password(app).await,

        ClientCommands::Transactions { command } => match command {
            TransactionCommands::List {
                category,
                from,
                to,
                limit,
            } => {
                let filter = cmoney_core::api::transactions::TransactionFilter {
                    category,
                    from,
                    to,
                    limit,
                };
                commands::transactions::list(app, &filter).await
            }
            TransactionCommands::Add { form } => commands::transactions::add(app, &form).await,
            TransactionCommands::Update {
                id,
                amount,
                category,
                date,
                description,
            } => {
                let patch = cmoney_core::api::transactions::TransactionPatch {
                    amount,
                    category,
                    transaction_date: date,
                    description,
                };
                commands::transactions::update(app, id, &patch).await
            }
            TransactionCommands::Delete { id } => commands::transactions::delete(app, id).await,
            TransactionCommands::QuickAdd { form } => {
                commands::transactions::quick_add(app, &form).await
            }
        },

        ClientCommands::Categories { command } => match command {
            CategoryCommands::List { kind } => commands::categories::list(app, kind).await,
            CategoryCommands::Add {
                name,
                kind,
                icon,
                color,
            } => {
                let input = cmoney_core::api::categories::CategoryInput {
                    name,
                    kind,
                    icon,
                    color,
                };
                commands::categories::add(app, &input).await
            }
            CategoryCommands::Update {
                id,
                name,
                kind,
                icon,
                color,
            } => {
                let patch = cmoney_core::api::categories::CategoryPatch {
                    name,
                    kind,
                    icon,
                    color,
                };
                commands::categories::update(app, id, &patch).await
            }
            CategoryCommands::Delete { id } => commands::categories::delete(app, id).await,
            CategoryCommands::InitDefaults => commands::categories::init_defaults(app).await,
            CategoryCommands::Stats => commands::categories::stats(app).await,
        },

        ClientCommands::Budgets { command } => match command {
            BudgetCommands::List {
                month,
                category,
                active,
            } => {
                let filter = cmoney_core::api::budgets::BudgetFilter {
                    year_month: month,
                    category,
                    is_active: active,
                };
                commands::budgets::list(app, &filter).await
            }
            BudgetCommands::Add { form } => commands::budgets::add(app, &form).await,
            BudgetCommands::Update { id, form } => {
                commands::budgets::update(app, id, &form).await
            }
            BudgetCommands::Delete { id } => commands::budgets::delete(app, id).await,
            BudgetCommands::CopyNext { id } => commands::budgets::copy_next(app, id).await,
            BudgetCommands::Current => commands::budgets::current(app).await,
            BudgetCommands::Alerts => commands::budgets::alerts(app).await,
        },

        ClientCommands::Reports { command } => match command {
            ReportCommands::Summary { month } => {
                commands::reports::summary(app, month.as_deref()).await
            }
            ReportCommands::Monthly { month } => {
                commands::reports::monthly(app, month).await
            }
            ReportCommands::Yearly { year } => commands::reports::yearly(app, year).await,
            ReportCommands::ExpenseAnalysis { start, end } => {
                commands::reports::expense_analysis(app, start, end).await
            }
            ReportCommands::Trend { months } => commands::reports::trend(app, months).await,
        },
    }
}
