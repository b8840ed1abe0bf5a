//! Command-line surface.

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

use bloodbank_core::{BloodType, DonationRequestId, DonorId, NotificationId, RequestId};
use bloodbank_infra::DatabaseConfig;
use bloodbank_infra::config::{DEFAULT_DATABASE_URL, DEFAULT_MAX_CONNECTIONS};
use bloodbank_observability::LogFormat;

#[derive(Parser, Debug)]
#[command(
    name = "bloodbank",
    version,
    about = "Donor registry and blood stock ledger for a blood bank"
)]
pub struct Cli {
    /// Database location (`sqlite://path/to/file.db` or `sqlite::memory:`)
    #[arg(
        long,
        global = true,
        env = "BLOODBANK_DATABASE_URL",
        default_value = DEFAULT_DATABASE_URL
    )]
    pub database_url: String,

    /// Connection pool size (in-memory databases always use one)
    #[arg(
        long,
        global = true,
        env = "BLOODBANK_MAX_CONNECTIONS",
        default_value_t = DEFAULT_MAX_CONNECTIONS
    )]
    pub max_connections: u32,

    /// Log filter directive, e.g. `debug` or `bloodbank_infra=trace`
    #[arg(long, global = true, env = "RUST_LOG", default_value = "info")]
    pub log_level: String,

    /// Log line format: pretty or json
    #[arg(long, global = true, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,

    /// Print machine-readable JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn database_config(&self) -> DatabaseConfig {
        DatabaseConfig::new(self.database_url.clone(), self.max_connections)
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create the schema and seed one inventory row per blood type
    Init,
    /// Manage registered donors
    #[command(subcommand)]
    Donor(DonorCommand),
    /// Adjust and report blood stock
    #[command(subcommand)]
    Inventory(InventoryCommand),
    /// Manage blood requests filed by patients
    #[command(subcommand)]
    Request(RequestCommand),
    /// Donation requests to donors and notifications to requesters
    #[command(subcommand)]
    Outreach(OutreachCommand),
}

#[derive(Subcommand, Debug)]
pub enum DonorCommand {
    /// Register a new donor
    Register(RegisterArgs),
    /// Show one donor
    Show { id: DonorId },
    /// List donors by name
    List {
        /// Only donors of this blood type (case-insensitive, e.g. `ab+`)
        #[arg(long)]
        blood_type: Option<BloodType>,
    },
    /// Correct a donor record
    Update(UpdateDonorArgs),
    /// Delete a donor and their outreach records
    Delete { id: DonorId },
    /// Donor counts per blood type, most common first
    Counts,
    /// Record a donation (stock is adjusted separately)
    Donated {
        id: DonorId,
        /// Donation date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,
    },
}

#[derive(Args, Debug)]
pub struct RegisterArgs {
    /// Operator-assigned donor identifier
    pub id: DonorId,
    #[arg(long)]
    pub name: String,
    #[arg(long)]
    pub age: u8,
    #[arg(long)]
    pub blood_type: BloodType,
    #[arg(long)]
    pub phone: String,
    #[arg(long)]
    pub address: String,
    #[arg(long)]
    pub email: Option<String>,
    /// Most recent donation (YYYY-MM-DD)
    #[arg(long)]
    pub last_donation: Option<NaiveDate>,
}

#[derive(Args, Debug)]
pub struct UpdateDonorArgs {
    pub id: DonorId,
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long)]
    pub age: Option<u8>,
    #[arg(long)]
    pub blood_type: Option<BloodType>,
    #[arg(long)]
    pub phone: Option<String>,
    #[arg(long)]
    pub address: Option<String>,
    #[arg(long)]
    pub email: Option<String>,
    #[arg(long, conflicts_with = "clear_last_donation")]
    pub last_donation: Option<NaiveDate>,
    /// Forget the recorded last donation date
    #[arg(long)]
    pub clear_last_donation: bool,
}

#[derive(Subcommand, Debug)]
pub enum InventoryCommand {
    /// Add (positive) or use (negative) units of one blood type
    Adjust {
        blood_type: BloodType,
        #[arg(allow_negative_numbers = true)]
        delta: i64,
    },
    /// Stock on hand for every blood type
    Report,
}

#[derive(Subcommand, Debug)]
pub enum RequestCommand {
    /// File a blood request
    Create(CreateRequestArgs),
    /// List requests, most distant date needed first
    List,
    /// Show one request
    Show { id: RequestId },
    /// Edit a request
    Update(UpdateRequestArgs),
    /// Delete a request and its outreach records
    Delete { id: RequestId },
    /// Donors whose blood type matches the request
    Matches { id: RequestId },
}

#[derive(Args, Debug)]
pub struct CreateRequestArgs {
    /// Patient name
    #[arg(long)]
    pub name: String,
    #[arg(long)]
    pub phone: String,
    #[arg(long)]
    pub blood_type: BloodType,
    #[arg(long, default_value = "")]
    pub reason: String,
    /// Note shown to donors in the appeal
    #[arg(long, default_value = "")]
    pub message: String,
    #[arg(long)]
    pub location: Option<String>,
    /// Date the blood is needed (YYYY-MM-DD)
    #[arg(long)]
    pub date_needed: Option<NaiveDate>,
}

#[derive(Args, Debug)]
pub struct UpdateRequestArgs {
    pub id: RequestId,
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long)]
    pub phone: Option<String>,
    #[arg(long)]
    pub blood_type: Option<BloodType>,
    #[arg(long)]
    pub reason: Option<String>,
    #[arg(long)]
    pub message: Option<String>,
    /// New location; an empty value clears it
    #[arg(long)]
    pub location: Option<String>,
    #[arg(long, conflicts_with = "clear_date_needed")]
    pub date_needed: Option<NaiveDate>,
    /// Mark the request as needed as soon as possible
    #[arg(long)]
    pub clear_date_needed: bool,
}

#[derive(Subcommand, Debug)]
pub enum OutreachCommand {
    /// Ask a donor to give blood for a request
    Send {
        donor: DonorId,
        request: RequestId,
        /// Custom message; a default appeal is composed otherwise
        #[arg(long)]
        message: Option<String>,
    },
    /// Pending donation requests for a donor, newest first
    Pending { donor: DonorId },
    /// Accept a donation request and notify the requester
    Accept { id: DonationRequestId },
    /// Reject a donation request
    Reject { id: DonationRequestId },
    /// Send a donor's contact details to the requester
    Notify { request: RequestId, donor: DonorId },
    /// Notifications for a request, newest first
    Notifications { request: RequestId },
    /// Mark a notification as read
    Read { id: NotificationId },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn negative_deltas_parse_as_values() {
        let cli = Cli::try_parse_from(["bloodbank", "inventory", "adjust", "o+", "-3"]).unwrap();
        match cli.command {
            Command::Inventory(InventoryCommand::Adjust { blood_type, delta }) => {
                assert_eq!(blood_type, BloodType::OPos);
                assert_eq!(delta, -3);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn unknown_blood_type_is_a_usage_error() {
        assert!(Cli::try_parse_from(["bloodbank", "donor", "list", "--blood-type", "C+"]).is_err());
    }
}
