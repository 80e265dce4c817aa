// ==========================================
// Scolaris - Types du domaine
// ==========================================
// Énumérations partagées par les composants (documents, semainier,
// notifications, alertes). Sérialisation SCREAMING_SNAKE_CASE,
// alignée sur les colonnes TEXT de la base.
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Erreur de parse d'une énumération du domaine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

impl fmt::Display for ParseEnumError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "valeur {} invalide: {}", self.kind, self.value)
    }
}

impl std::error::Error for ParseEnumError {}

// ==========================================
// Type de document pédagogique
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentType {
    FichePedagogique, // fiche de préparation de séance
    CahierJournal,    // journal quotidien de classe
    CahierTexte,      // cahier de textes (visé, non approuvé)
    Semainier,        // planification hebdomadaire
}

impl DocumentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::FichePedagogique => "FICHE_PEDAGOGIQUE",
            DocumentType::CahierJournal => "CAHIER_JOURNAL",
            DocumentType::CahierTexte => "CAHIER_TEXTE",
            DocumentType::Semainier => "SEMAINIER",
        }
    }

    /// Seul le cahier de textes se fait viser (ACKNOWLEDGED) plutôt qu'approuver.
    pub fn supports_acknowledgment(&self) -> bool {
        matches!(self, DocumentType::CahierTexte)
    }

    pub fn label(&self) -> &'static str {
        match self {
            DocumentType::FichePedagogique => "fiche pédagogique",
            DocumentType::CahierJournal => "cahier journal",
            DocumentType::CahierTexte => "cahier de textes",
            DocumentType::Semainier => "semainier",
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for DocumentType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "FICHE_PEDAGOGIQUE" => Ok(DocumentType::FichePedagogique),
            "CAHIER_JOURNAL" => Ok(DocumentType::CahierJournal),
            "CAHIER_TEXTE" => Ok(DocumentType::CahierTexte),
            "SEMAINIER" => Ok(DocumentType::Semainier),
            other => Err(ParseEnumError { kind: "DocumentType", value: other.to_string() }),
        }
    }
}

// ==========================================
// Rôle d'un utilisateur de l'annuaire
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Teacher,
    Director,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Teacher => "TEACHER",
            Role::Director => "DIRECTOR",
            Role::Admin => "ADMIN",
        }
    }

    /// Les rôles de direction reçoivent les soumissions et peuvent statuer.
    pub fn is_reviewer(&self) -> bool {
        matches!(self, Role::Director | Role::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Role {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "TEACHER" => Ok(Role::Teacher),
            "DIRECTOR" => Ok(Role::Director),
            "ADMIN" => Ok(Role::Admin),
            other => Err(ParseEnumError { kind: "Role", value: other.to_string() }),
        }
    }
}

// ==========================================
// Mode d'affectation du semainier
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssignmentMode {
    Auto,   // rotation circulaire
    Manual, // dérogation de la direction
}

impl AssignmentMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssignmentMode::Auto => "AUTO",
            AssignmentMode::Manual => "MANUAL",
        }
    }
}

impl fmt::Display for AssignmentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AssignmentMode {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "AUTO" => Ok(AssignmentMode::Auto),
            "MANUAL" => Ok(AssignmentMode::Manual),
            other => Err(ParseEnumError { kind: "AssignmentMode", value: other.to_string() }),
        }
    }
}

// ==========================================
// Gravité d'un incident
// ==========================================
// Ordre: Low < Medium < High < Critical
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IncidentSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl IncidentSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            IncidentSeverity::Low => "LOW",
            IncidentSeverity::Medium => "MEDIUM",
            IncidentSeverity::High => "HIGH",
            IncidentSeverity::Critical => "CRITICAL",
        }
    }

    /// Escalade QHSE dérivée de la seule gravité.
    pub fn requires_escalation(&self) -> bool {
        matches!(self, IncidentSeverity::High | IncidentSeverity::Critical)
    }
}

impl fmt::Display for IncidentSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for IncidentSeverity {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "LOW" => Ok(IncidentSeverity::Low),
            "MEDIUM" => Ok(IncidentSeverity::Medium),
            "HIGH" => Ok(IncidentSeverity::High),
            "CRITICAL" => Ok(IncidentSeverity::Critical),
            other => Err(ParseEnumError { kind: "IncidentSeverity", value: other.to_string() }),
        }
    }
}

// ==========================================
// Gravité d'une alerte opérationnelle
// ==========================================
// Ordre de tri du rapport: Critical < High < Medium < Low
// (croissant = le plus urgent d'abord)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertSeverity {
    Critical,
    High,
    Medium,
    Low,
}

impl AlertSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertSeverity::Critical => "CRITICAL",
            AlertSeverity::High => "HIGH",
            AlertSeverity::Medium => "MEDIUM",
            AlertSeverity::Low => "LOW",
        }
    }
}

impl fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// Catégorie d'alerte
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertCategory {
    SubmissionDelay,
    HighRejectionRate,
    NonConformTeachers,
    PedagogicalOverload,
    RecurringIncidents,
    OverdueSemainier,
    PendingValidation,
}

impl AlertCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertCategory::SubmissionDelay => "SUBMISSION_DELAY",
            AlertCategory::HighRejectionRate => "HIGH_REJECTION_RATE",
            AlertCategory::NonConformTeachers => "NON_CONFORM_TEACHERS",
            AlertCategory::PedagogicalOverload => "PEDAGOGICAL_OVERLOAD",
            AlertCategory::RecurringIncidents => "RECURRING_INCIDENTS",
            AlertCategory::OverdueSemainier => "OVERDUE_SEMAINIER",
            AlertCategory::PendingValidation => "PENDING_VALIDATION",
        }
    }
}

impl fmt::Display for AlertCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// Décision d'une revue
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewDecision {
    Approved,
    Rejected,
}

impl ReviewDecision {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewDecision::Approved => "APPROVED",
            ReviewDecision::Rejected => "REJECTED",
        }
    }
}

impl fmt::Display for ReviewDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ReviewDecision {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "APPROVED" => Ok(ReviewDecision::Approved),
            "REJECTED" => Ok(ReviewDecision::Rejected),
            other => Err(ParseEnumError { kind: "ReviewDecision", value: other.to_string() }),
        }
    }
}
