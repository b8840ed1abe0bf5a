//! Rendering of command results on stdout.

use std::io::{self, Write};

use anyhow::Result;
use serde::Serialize;

use bloodbank_core::Entity;
use bloodbank_inventory::{StockAdjusted, StockLevel};
use bloodbank_registry::{BloodRequest, BloodTypeCount, DonationRequest, Donor, Notification};

/// Text for operators, JSON for scripts.
#[derive(Debug, Clone, Copy)]
pub struct Output {
    json: bool,
}

impl Output {
    pub fn new(json: bool) -> Self {
        Self { json }
    }

    /// Print `value` as JSON, or the lines produced by `text`.
    pub fn emit<T, F>(&self, value: &T, text: F) -> Result<()>
    where
        T: Serialize + ?Sized,
        F: FnOnce(&T) -> Vec<String>,
    {
        let mut stdout = io::stdout().lock();
        if self.json {
            serde_json::to_writer_pretty(&mut stdout, value)?;
            writeln!(stdout)?;
        } else {
            for line in text(value) {
                writeln!(stdout, "{line}")?;
            }
        }
        Ok(())
    }
}

pub fn donor_line(donor: &Donor) -> String {
    format!(
        "{}\t{}\t{}\t{}\t{}",
        donor.id(),
        donor.name(),
        donor.blood_type(),
        donor.contact().phone,
        donor
            .last_donation()
            .map_or_else(|| "-".to_string(), |d| d.to_string()),
    )
}

pub fn donor_details(donor: &Donor) -> Vec<String> {
    let contact = donor.contact();
    vec![
        format!("id:            {}", donor.id()),
        format!("name:          {}", donor.name()),
        format!("age:           {}", donor.age()),
        format!("blood type:    {}", donor.blood_type()),
        format!("phone:         {}", contact.phone),
        format!("address:       {}", contact.address),
        format!("email:         {}", contact.email.as_deref().unwrap_or("-")),
        format!(
            "last donation: {}",
            donor
                .last_donation()
                .map_or_else(|| "-".to_string(), |d| d.to_string())
        ),
        format!("registered at: {}", donor.registered_at().to_rfc3339()),
    ]
}

pub fn count_line(count: &BloodTypeCount) -> String {
    format!("{}\t{}", count.blood_type, count.donors)
}

pub fn stock_line(level: &StockLevel) -> String {
    format!("{}\t{}", level.blood_type, level.quantity)
}

pub fn adjustment_line(adjusted: &StockAdjusted) -> String {
    format!(
        "{}: {} -> {}",
        adjusted.blood_type, adjusted.quantity_before, adjusted.quantity_after
    )
}

pub fn request_line(request: &BloodRequest) -> String {
    format!(
        "{}\t{}\t{}\t{}\t{}",
        request.id,
        request.name,
        request.blood_type,
        request
            .date_needed
            .map_or_else(|| "-".to_string(), |d| d.to_string()),
        request.location.as_deref().unwrap_or("-"),
    )
}

pub fn request_details(request: &BloodRequest) -> Vec<String> {
    vec![
        format!("id:           {}", request.id),
        format!("name:         {}", request.name),
        format!("phone:        {}", request.phone),
        format!("blood type:   {}", request.blood_type),
        format!("reason:       {}", request.reason),
        format!("message:      {}", request.message),
        format!("location:     {}", request.location.as_deref().unwrap_or("-")),
        format!(
            "date needed:  {}",
            request
                .date_needed
                .map_or_else(|| "-".to_string(), |d| d.to_string())
        ),
        format!("requested at: {}", request.requested_at.to_rfc3339()),
    ]
}

pub fn donation_request_line(request: &DonationRequest) -> String {
    format!(
        "{}\t{}\t{}\t{}",
        request.id,
        request.request_id,
        request.status,
        request.message.lines().next().unwrap_or_default(),
    )
}

pub fn notification_line(notification: &Notification) -> String {
    format!(
        "{}\t{}\t{}\t{}",
        notification.id,
        notification.donor_id,
        if notification.is_read { "read" } else { "unread" },
        notification.created_at.to_rfc3339(),
    )
}
