//! Member notifications.

use std::future::Future;

use sodalis_shared::OutgoingEmail;

use super::types::{Fee, Member, Receipt, SocialYear};

/// Hands messages to the mail pipeline.
///
/// Returns whether the message was accepted or queued. Delivery is never
/// awaited beyond that.
pub trait Notifier: Send + Sync {
    /// Queue or send one message.
    fn queue_or_send(&self, message: OutgoingEmail) -> impl Future<Output = bool> + Send;
}

/// "New fee" message, or `None` when the member has no address.
#[must_use]
pub fn new_fee_message(member: &Member, fee: &Fee, year: &SocialYear) -> Option<OutgoingEmail> {
    let to = member.email.as_deref()?.trim();
    if to.is_empty() {
        return None;
    }

    let due = fee.due_date.format("%d/%m/%Y");
    let subject = format!("{} {} - nuova quota", fee.fee_type, year.name);
    let html_body = format!(
        "<p>Gentile {first} {last},</p>\
         <p>è stata registrata la quota <strong>{fee_type}</strong> per l'anno sociale {year} \
         di <strong>€ {amount}</strong>, con scadenza il {due}.</p>",
        first = member.first_name,
        last = member.last_name,
        fee_type = fee.fee_type,
        year = year.name,
        amount = fee.amount,
    );
    let text_body = format!(
        "Gentile {} {},\nè stata registrata la quota {} per l'anno sociale {} di € {}, con scadenza il {}.",
        member.first_name, member.last_name, fee.fee_type, year.name, fee.amount, due
    );

    Some(OutgoingEmail {
        to: to.to_string(),
        subject,
        html_body,
        text_body: Some(text_body),
    })
}

/// "Payment received" message, or `None` when the member has no address.
#[must_use]
pub fn payment_received_message(
    member: &Member,
    fee: &Fee,
    receipt: &Receipt,
) -> Option<OutgoingEmail> {
    let to = member.email.as_deref()?.trim();
    if to.is_empty() {
        return None;
    }

    let subject = format!("Ricevuta {}", receipt.receipt_number);
    let html_body = format!(
        "<p>Gentile {first} {last},</p>\
         <p>abbiamo ricevuto il pagamento della quota <strong>{fee_type}</strong> \
         di <strong>€ {amount}</strong> ({method}).</p>\
         <p>Ricevuta n. <strong>{number}</strong>.</p>",
        first = member.first_name,
        last = member.last_name,
        fee_type = fee.fee_type,
        amount = fee.amount,
        method = receipt.payment_method.label(),
        number = receipt.receipt_number,
    );
    let text_body = format!(
        "Gentile {} {},\nabbiamo ricevuto il pagamento della quota {} di € {} ({}).\nRicevuta n. {}.",
        member.first_name,
        member.last_name,
        fee.fee_type,
        fee.amount,
        receipt.payment_method.label(),
        receipt.receipt_number
    );

    Some(OutgoingEmail {
        to: to.to_string(),
        subject,
        html_body,
        text_body: Some(text_body),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fee::types::{FeeStatus, PaymentMethod};
    use chrono::{NaiveDate, Utc};
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn member(email: Option<&str>) -> Member {
        Member {
            id: Uuid::new_v4(),
            first_name: "Anna".into(),
            last_name: "Rossi".into(),
            email: email.map(str::to_string),
            created_at: Utc::now(),
        }
    }

    fn year() -> SocialYear {
        SocialYear {
            id: Uuid::new_v4(),
            name: "2024".into(),
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
            is_current: true,
        }
    }

    fn fee(member: &Member, year: &SocialYear) -> Fee {
        Fee {
            id: Uuid::new_v4(),
            member_id: member.id,
            social_year_id: year.id,
            fee_type: "Quota associativa".into(),
            amount: dec!(50.00),
            due_date: NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
            paid_date: None,
            payment_method: None,
            receipt_number: None,
            status: FeeStatus::Pending,
            payment_pending: false,
            payment_reference: None,
            notes: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_new_fee_message() {
        let m = member(Some("anna@example.org"));
        let y = year();
        let msg = new_fee_message(&m, &fee(&m, &y), &y).unwrap();
        assert_eq!(msg.to, "anna@example.org");
        assert!(msg.subject.contains("Quota associativa"));
        assert!(msg.html_body.contains("50.00"));
        assert!(msg.html_body.contains("31/12/2024"));
        assert!(msg.text_body.unwrap().contains("Anna Rossi"));
    }

    #[test]
    fn test_no_message_without_address() {
        let y = year();
        let none = member(None);
        let blank = member(Some("  "));
        assert!(new_fee_message(&none, &fee(&none, &y), &y).is_none());
        assert!(new_fee_message(&blank, &fee(&blank, &y), &y).is_none());
    }

    #[test]
    fn test_payment_received_message() {
        let m = member(Some("anna@example.org"));
        let y = year();
        let f = fee(&m, &y);
        let receipt = Receipt {
            id: Uuid::new_v4(),
            fee_id: f.id,
            year: 2024,
            sequence: 7,
            receipt_number: "2024/0007".into(),
            payment_method: PaymentMethod::BankTransfer,
            payment_details: None,
            issued_by: Uuid::new_v4(),
            generated_at: Utc::now(),
        };
        let msg = payment_received_message(&m, &f, &receipt).unwrap();
        assert_eq!(msg.subject, "Ricevuta 2024/0007");
        assert!(msg.html_body.contains("Bonifico bancario"));
    }
}
