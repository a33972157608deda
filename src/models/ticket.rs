use serde::{Deserialize, Serialize};

/// Labelled support ticket used to train the mixed-feature priority model.
///
/// Column names match the training CSV header; extra columns are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketRecord {
    /// Free-form ticket text
    pub text: String,

    /// Money spent by the customer over the last 30 days
    pub spend30d: f64,

    /// Minutes left before the SLA is breached (negative once breached)
    pub eta_to_sla_min: f64,

    /// Business domain ("rb" or "m" in the reference data)
    pub domain: String,

    /// VIP flag encoded as an integer
    pub vip: i64,

    /// Ground-truth priority, read as text whatever its CSV type
    pub label: String,
}

impl TicketRecord {
    /// Drop the label, keeping the fields a prediction request carries
    pub fn features(&self) -> TicketFeatures {
        TicketFeatures {
            text: self.text.clone(),
            domain: self.domain.clone(),
            vip: self.vip,
            spend30d: self.spend30d,
            eta_to_sla_min: self.eta_to_sla_min,
        }
    }
}

/// Unlabelled ticket: the body of `POST /predict`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketFeatures {
    pub text: String,
    pub domain: String,
    pub vip: i64,
    pub spend30d: f64,
    pub eta_to_sla_min: f64,
}

/// Maintenance issue with its priority label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssueRecord {
    /// Reported problem, usually in Spanish
    pub issue: String,

    /// Ground-truth priority
    pub priority: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ticket_record_from_csv_row() {
        let data = "text,spend30d,eta_to_sla_min,domain,vip,label\n\
                    \"Site down, checkout failing\",1200.5,-15,rb,1,high\n";
        let mut reader = csv::Reader::from_reader(data.as_bytes());
        let record: TicketRecord = reader.deserialize().next().unwrap().unwrap();

        assert_eq!(record.text, "Site down, checkout failing");
        assert_eq!(record.eta_to_sla_min, -15.0);
        assert_eq!(record.vip, 1);
        assert_eq!(record.label, "high");
    }

    #[test]
    fn test_numeric_label_is_read_as_text() {
        let data = "issue,priority\nFuga de agua,2\n";
        let mut reader = csv::Reader::from_reader(data.as_bytes());
        let record: IssueRecord = reader.deserialize().next().unwrap().unwrap();
        assert_eq!(record.priority, "2");
    }

    #[test]
    fn test_features_drop_label() {
        let record = TicketRecord {
            text: "refund please".to_string(),
            spend30d: 10.0,
            eta_to_sla_min: 300.0,
            domain: "m".to_string(),
            vip: 0,
            label: "low".to_string(),
        };
        let features = record.features();
        assert_eq!(features.text, "refund please");
        assert_eq!(features.domain, "m");
    }

    #[test]
    fn test_request_requires_every_field() {
        let missing_vip = r#"{"text":"x","domain":"rb","spend30d":1.0,"eta_to_sla_min":2.0}"#;
        assert!(serde_json::from_str::<TicketFeatures>(missing_vip).is_err());

        let mistyped = r#"{"text":"x","domain":"rb","vip":"yes","spend30d":1.0,"eta_to_sla_min":2.0}"#;
        assert!(serde_json::from_str::<TicketFeatures>(mistyped).is_err());
    }
}
