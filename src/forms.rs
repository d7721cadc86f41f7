//! Adoption, volunteer and rescue-report submissions.
//!
//! Submissions are validated locally and then "sent" after a simulated
//! network delay; the view stays interactive while the future is pending.

use crate::catalog::Catalog;
use crate::error::FormError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FormKind {
    Adoption,
    Volunteer,
    RescueReport,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Receipt {
    pub reference: Uuid,
    pub kind: FormKind,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct AdoptionApplication {
    pub animal_id: u32,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    #[serde(default)]
    pub has_other_pets: bool,
    #[serde(default)]
    pub message: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct VolunteerApplication {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    #[serde(default)]
    pub interests: Vec<String>,
    #[serde(default)]
    pub availability: String,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    Low,
    #[default]
    Medium,
    High,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct RescueReport {
    pub reporter_name: String,
    pub contact: String,
    pub animal_type: String,
    pub description: String,
    // Free text, or a formatted geolocation fix
    pub location: String,
    #[serde(default)]
    pub urgency: Urgency,
}

/// A one-shot position from the device's geolocation provider.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoFix {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoFix {
    /// Text embedded verbatim in the report's location field.
    pub fn to_location_string(&self) -> String {
        format!("Lat: {:.4}, Lon: {:.4}", self.latitude, self.longitude)
    }
}

fn require(value: &str, field: &'static str) -> Result<(), FormError> {
    if value.trim().is_empty() {
        return Err(FormError::MissingField { field });
    }
    Ok(())
}

fn require_email(email: &str) -> Result<(), FormError> {
    require(email, "Email")?;
    let email = email.trim();
    let valid = match email.split_once('@') {
        Some((user, domain)) => !user.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.'),
        None => false,
    };
    if !valid {
        return Err(FormError::InvalidEmail(email.to_string()));
    }
    Ok(())
}

pub struct FormService {
    delay: Duration,
}

impl FormService {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    pub async fn submit_adoption(&self, catalog: &Catalog, form: &AdoptionApplication) -> Result<Receipt, FormError> {
        let animal = catalog
            .get(form.animal_id)
            .ok_or(FormError::UnknownAnimal(form.animal_id))?;
        if animal.adopted {
            return Err(FormError::AlreadyAdopted(animal.name.clone()));
        }
        require(&form.full_name, "Full name")?;
        require_email(&form.email)?;
        require(&form.phone, "Phone")?;
        require(&form.address, "Address")?;
        log::info!("Submitting adoption application for {}", animal.name);
        Ok(self.send(FormKind::Adoption).await)
    }

    pub async fn submit_volunteer(&self, form: &VolunteerApplication) -> Result<Receipt, FormError> {
        require(&form.full_name, "Full name")?;
        require_email(&form.email)?;
        require(&form.phone, "Phone")?;
        log::info!("Submitting volunteer application ({} interests)", form.interests.len());
        Ok(self.send(FormKind::Volunteer).await)
    }

    pub async fn submit_rescue_report(&self, form: &RescueReport) -> Result<Receipt, FormError> {
        require(&form.reporter_name, "Your name")?;
        require(&form.contact, "Contact")?;
        require(&form.description, "Description")?;
        require(&form.location, "Location")?;
        log::info!("Submitting {:?} urgency rescue report at {}", form.urgency, form.location);
        Ok(self.send(FormKind::RescueReport).await)
    }

    async fn send(&self, kind: FormKind) -> Receipt {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let receipt = Receipt {
            reference: Uuid::new_v4(),
            kind,
            submitted_at: Utc::now(),
        };
        log::debug!("Form {:?} accepted with reference {}", kind, receipt.reference);
        receipt
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> FormService {
        FormService::new(Duration::ZERO)
    }

    fn adoption(animal_id: u32) -> AdoptionApplication {
        AdoptionApplication {
            animal_id,
            full_name: "Jane Doe".to_string(),
            email: "jane@example.com".to_string(),
            phone: "01700000000".to_string(),
            address: "Dhanmondi, Dhaka".to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn adoption_checks_animal_and_fields() {
        let catalog = Catalog::default();
        let receipt = service().submit_adoption(&catalog, &adoption(1)).await.unwrap();
        assert_eq!(receipt.kind, FormKind::Adoption);

        assert_eq!(
            service().submit_adoption(&catalog, &adoption(404)).await,
            Err(FormError::UnknownAnimal(404))
        );
        assert_eq!(
            service().submit_adoption(&catalog, &adoption(8)).await,
            Err(FormError::AlreadyAdopted("Pakhi".to_string()))
        );

        let mut missing_phone = adoption(1);
        missing_phone.phone = " ".to_string();
        assert_eq!(
            service().submit_adoption(&catalog, &missing_phone).await,
            Err(FormError::MissingField { field: "Phone" })
        );
    }

    #[tokio::test]
    async fn volunteer_rejects_bad_email() {
        let form = VolunteerApplication {
            full_name: "Rafi".to_string(),
            email: "rafi@localhost".to_string(),
            phone: "01800000000".to_string(),
            ..Default::default()
        };
        assert_eq!(
            service().submit_volunteer(&form).await,
            Err(FormError::InvalidEmail("rafi@localhost".to_string()))
        );
    }

    #[tokio::test]
    async fn rescue_report_embeds_geolocation() {
        let fix = GeoFix {
            latitude: 23.810331,
            longitude: 90.412521,
        };
        let report = RescueReport {
            reporter_name: "Nila".to_string(),
            contact: "01900000000".to_string(),
            animal_type: "Dog".to_string(),
            description: "Injured leg, near the bus stand".to_string(),
            location: fix.to_location_string(),
            urgency: Urgency::High,
        };
        assert_eq!(report.location, "Lat: 23.8103, Lon: 90.4125");
        let receipt = service().submit_rescue_report(&report).await.unwrap();
        assert_eq!(receipt.kind, FormKind::RescueReport);
    }

    #[tokio::test]
    async fn submission_waits_for_the_configured_delay() {
        let started = std::time::Instant::now();
        let form = VolunteerApplication {
            full_name: "Rafi".to_string(),
            email: "rafi@example.com".to_string(),
            phone: "01800000000".to_string(),
            ..Default::default()
        };
        FormService::new(Duration::from_millis(20)).submit_volunteer(&form).await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(20));
    }
}
