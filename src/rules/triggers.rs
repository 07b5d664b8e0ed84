use crate::types::EscalationTier;

/// Literal phrases checked before and after the category tables.
#[derive(Debug, Clone, Default)]
pub struct TriggerPatterns {
    pub immediate_alert: Vec<String>,
    pub escalation_required: Vec<String>,
    pub trend_alerts: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct EscalationRule {
    pub tier: EscalationTier,
    pub phrases: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct CombinedTrigger {
    pub scenario: String,
    pub conditions: Vec<String>,
    pub action: String,
}

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

pub(crate) fn lab_trigger_patterns() -> TriggerPatterns {
    TriggerPatterns {
        immediate_alert: owned(&[
            "all analyzers offline",
            "analyzers are offline",
            "critical value not called",
            "lis down",
            "system down",
            "patient safety event",
            "sample mix-up",
            "power outage",
            "fire alarm",
        ]),
        escalation_required: owned(&[
            "unable to resolve",
            "needs escalation",
            "repeated failure",
            "multiple failures",
            "supervisor needed",
            "sla breach",
        ]),
        trend_alerts: owned(&[
            "trending up",
            "trending down",
            "increasing trend",
            "gradual increase",
            "shift in qc",
            "consecutive",
        ]),
    }
}

// Tier order is resolution order.
pub(crate) fn lab_escalation_rules() -> Vec<EscalationRule> {
    vec![
        EscalationRule {
            tier: EscalationTier::ImmediateSupervisor,
            phrases: owned(&["qc failure", "single instrument", "minor delay", "reagent low", "sick call"]),
        },
        EscalationRule {
            tier: EscalationTier::ManagerNotification,
            phrases: owned(&["multiple instruments", "short staffed", "staffing shortage", "tat exceeded", "repeated"]),
        },
        EscalationRule {
            tier: EscalationTier::DirectorEscalation,
            phrases: owned(&["all analyzers", "analyzers are offline", "system down", "lis down", "cap inspection", "extended outage"]),
        },
        EscalationRule {
            tier: EscalationTier::MedicalDirector,
            phrases: owned(&["critical value", "patient safety", "wrong patient", "patient harm", "sample mix-up"]),
        },
    ]
}

pub(crate) fn lab_combined_triggers() -> Vec<CombinedTrigger> {
    vec![
        CombinedTrigger {
            scenario: "perfect_storm".to_string(),
            conditions: owned(&["multiple instruments down", "short staffed", "high volume"]),
            action: "Activate lab surge plan and page the laboratory director".to_string(),
        },
        CombinedTrigger {
            scenario: "quality_crisis".to_string(),
            conditions: owned(&["qc failure", "instrument malfunction", "critical value pending"]),
            action: "Hold patient reporting on affected analyzers and notify the medical director".to_string(),
        },
        CombinedTrigger {
            scenario: "supply_crisis".to_string(),
            conditions: owned(&["reagent shortage", "high volume"]),
            action: "Request emergency reagent shipment and prioritize STAT testing".to_string(),
        },
        CombinedTrigger {
            scenario: "compliance_risk".to_string(),
            conditions: owned(&["audit finding", "qc failure"]),
            action: "Open corrective action and notify the quality manager".to_string(),
        },
    ]
}
