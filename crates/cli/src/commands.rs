//! Command handlers: translate parsed arguments into `BloodBank` calls.

use anyhow::{Context, Result};

use bloodbank_core::RequestId;
use bloodbank_infra::service::now;
use bloodbank_infra::{BloodBank, BloodBankStore, StoreError};
use bloodbank_registry::{ContactInfo, CreateRequest, DonorUpdate, RegisterDonor, RequestUpdate};

use crate::cli::{
    Command, CreateRequestArgs, DonorCommand, InventoryCommand, OutreachCommand, RegisterArgs,
    RequestCommand, UpdateDonorArgs, UpdateRequestArgs,
};
use crate::output::{self, Output};

pub async fn run<S: BloodBankStore>(
    bank: &BloodBank<S>,
    command: Command,
    out: Output,
) -> Result<()> {
    match command {
        Command::Init => {
            let report = bank.setup().await.context("failed to seed inventory")?;
            out.emit(&report, |r| r.iter().map(output::stock_line).collect())
        }
        Command::Donor(cmd) => donor(bank, cmd, out).await,
        Command::Inventory(cmd) => inventory(bank, cmd, out).await,
        Command::Request(cmd) => request(bank, cmd, out).await,
        Command::Outreach(cmd) => outreach(bank, cmd, out).await,
    }
}

async fn donor<S: BloodBankStore>(
    bank: &BloodBank<S>,
    cmd: DonorCommand,
    out: Output,
) -> Result<()> {
    match cmd {
        DonorCommand::Register(args) => {
            let id = args.id.clone();
            let donor = bank
                .register_donor(&registration(args))
                .await
                .with_context(|| format!("failed to register donor {id}"))?;
            out.emit(&donor, |d| vec![format!("registered {}", output::donor_line(d))])
        }
        DonorCommand::Show { id } => {
            let donor = bank.donor(&id).await?;
            out.emit(&donor, output::donor_details)
        }
        DonorCommand::List { blood_type } => {
            let donors = bank.list_donors(blood_type).await?;
            out.emit(&donors, |ds| ds.iter().map(output::donor_line).collect())
        }
        DonorCommand::Update(args) => {
            let id = args.id.clone();
            let current = bank.donor(&id).await?;
            let update = donor_update(args, current.contact());
            let donor = bank
                .update_donor(&id, &update)
                .await
                .with_context(|| format!("failed to update donor {id}"))?;
            out.emit(&donor, |d| vec![format!("updated {}", output::donor_line(d))])
        }
        DonorCommand::Delete { id } => {
            bank.delete_donor(&id).await?;
            out.emit(&serde_json::json!({ "deleted": id }), |_| {
                vec![format!("deleted donor {id}")]
            })
        }
        DonorCommand::Counts => {
            let counts = bank.donor_counts().await?;
            out.emit(&counts, |cs| cs.iter().map(output::count_line).collect())
        }
        DonorCommand::Donated { id, date } => {
            let date = date.unwrap_or_else(|| now().date_naive());
            let donor = bank
                .record_donation(&id, date)
                .await
                .with_context(|| format!("failed to record donation for {id}"))?;
            out.emit(&donor, |d| {
                vec![format!("recorded donation on {date} for {}", output::donor_line(d))]
            })
        }
    }
}

async fn inventory<S: BloodBankStore>(
    bank: &BloodBank<S>,
    cmd: InventoryCommand,
    out: Output,
) -> Result<()> {
    match cmd {
        InventoryCommand::Adjust { blood_type, delta } => {
            let adjusted = match bank.adjust_stock(blood_type, delta).await {
                Err(StoreError::NotFound(_)) => {
                    anyhow::bail!("no inventory row for {blood_type}; run `bloodbank init` first")
                }
                other => other?,
            };
            out.emit(&adjusted, |a| vec![output::adjustment_line(a)])
        }
        InventoryCommand::Report => {
            let report = bank.stock_report().await?;
            out.emit(&report, |r| r.iter().map(output::stock_line).collect())
        }
    }
}

async fn request<S: BloodBankStore>(
    bank: &BloodBank<S>,
    cmd: RequestCommand,
    out: Output,
) -> Result<()> {
    match cmd {
        RequestCommand::Create(args) => {
            let request = bank
                .create_request(&create_request(args))
                .await
                .context("failed to create blood request")?;
            out.emit(&request, |r| vec![r.id.to_string()])
        }
        RequestCommand::List => {
            let requests = bank.list_requests().await?;
            out.emit(&requests, |rs| rs.iter().map(output::request_line).collect())
        }
        RequestCommand::Show { id } => {
            let request = bank.request(id).await?;
            out.emit(&request, output::request_details)
        }
        RequestCommand::Update(args) => {
            let id = args.id;
            let request = bank
                .update_request(id, &request_update(args))
                .await
                .with_context(|| format!("failed to update blood request {id}"))?;
            out.emit(&request, |r| vec![format!("updated {}", output::request_line(r))])
        }
        RequestCommand::Delete { id } => {
            bank.delete_request(id).await?;
            out.emit(&serde_json::json!({ "deleted": id }), |_| {
                vec![format!("deleted blood request {id}")]
            })
        }
        RequestCommand::Matches { id } => {
            let donors = bank.matching_donors(id).await?;
            out.emit(&donors, |ds| ds.iter().map(output::donor_line).collect())
        }
    }
}

async fn outreach<S: BloodBankStore>(
    bank: &BloodBank<S>,
    cmd: OutreachCommand,
    out: Output,
) -> Result<()> {
    match cmd {
        OutreachCommand::Send {
            donor,
            request,
            message,
        } => {
            let sent = bank
                .send_donation_request(&donor, request, message.as_deref())
                .await
                .with_context(|| format!("failed to send donation request to {donor}"))?;
            out.emit(&sent, |s| vec![s.id.to_string()])
        }
        OutreachCommand::Pending { donor } => {
            let pending = bank.pending_for_donor(&donor).await?;
            out.emit(&pending, |ps| {
                ps.iter().map(output::donation_request_line).collect()
            })
        }
        OutreachCommand::Accept { id } => {
            let (accepted, notification) = bank.accept_donation_request(id).await?;
            out.emit(
                &serde_json::json!({
                    "donation_request": accepted,
                    "notification": notification,
                }),
                |_| {
                    vec![format!(
                        "accepted {}; requester notified ({})",
                        accepted.id, notification.id
                    )]
                },
            )
        }
        OutreachCommand::Reject { id } => {
            let rejected = bank.reject_donation_request(id).await?;
            out.emit(&rejected, |r| vec![format!("rejected {}", r.id)])
        }
        OutreachCommand::Notify { request, donor } => {
            let notification = bank.notify_requester(request, &donor).await?;
            out.emit(&notification, |n| vec![n.id.to_string()])
        }
        OutreachCommand::Notifications { request } => {
            let notifications = bank.notifications(request).await?;
            out.emit(&notifications, |ns| {
                ns.iter().map(output::notification_line).collect()
            })
        }
        OutreachCommand::Read { id } => {
            bank.mark_notification_read(id).await?;
            out.emit(&serde_json::json!({ "read": id }), |_| {
                vec![format!("marked {id} as read")]
            })
        }
    }
}

fn registration(args: RegisterArgs) -> RegisterDonor {
    RegisterDonor {
        donor_id: args.id,
        name: args.name,
        age: args.age,
        blood_type: args.blood_type,
        contact: ContactInfo {
            phone: args.phone,
            address: args.address,
            email: args.email,
        },
        last_donation: args.last_donation,
        occurred_at: now(),
    }
}

/// Contact fields are replaced as a unit; missing ones keep their current value.
fn donor_update(args: UpdateDonorArgs, current: &ContactInfo) -> DonorUpdate {
    let contact = if args.phone.is_some() || args.address.is_some() || args.email.is_some() {
        Some(ContactInfo {
            phone: args.phone.unwrap_or_else(|| current.phone.clone()),
            address: args.address.unwrap_or_else(|| current.address.clone()),
            email: args.email.or_else(|| current.email.clone()),
        })
    } else {
        None
    };

    DonorUpdate {
        name: args.name,
        age: args.age,
        blood_type: args.blood_type,
        contact,
        last_donation: clearable(args.last_donation, args.clear_last_donation),
    }
}

fn create_request(args: CreateRequestArgs) -> CreateRequest {
    CreateRequest {
        request_id: RequestId::new(),
        name: args.name,
        phone: args.phone,
        blood_type: args.blood_type,
        reason: args.reason,
        message: args.message,
        location: args.location,
        date_needed: args.date_needed,
        occurred_at: now(),
    }
}

fn request_update(args: UpdateRequestArgs) -> RequestUpdate {
    RequestUpdate {
        name: args.name,
        phone: args.phone,
        blood_type: args.blood_type,
        reason: args.reason,
        message: args.message,
        location: args.location,
        date_needed: clearable(args.date_needed, args.clear_date_needed),
    }
}

/// `--clear-*` wins over keeping the value; clap rejects passing both.
fn clearable<T>(value: Option<T>, clear: bool) -> Option<Option<T>> {
    if clear { Some(None) } else { value.map(Some) }
}
