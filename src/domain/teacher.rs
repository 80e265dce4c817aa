// ==========================================
// Scolaris - Portée scolaire et annuaire
// ==========================================
// SchoolScope est la clé de partitionnement opaque
// (établissement, année scolaire, niveau). Toutes les opérations
// du coeur la reçoivent telle quelle.
// ==========================================

use crate::domain::types::Role;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ==========================================
// SchoolScope - (établissement, année, niveau)
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SchoolScope {
    pub org_id: String,
    pub academic_year: String, // ex: "2025-2026"
    pub school_level: String,  // ex: "COLLEGE", "LYCEE", "PRIMAIRE"
}

impl SchoolScope {
    pub fn new(org_id: impl Into<String>, academic_year: impl Into<String>, school_level: impl Into<String>) -> Self {
        Self {
            org_id: org_id.into(),
            academic_year: academic_year.into(),
            school_level: school_level.into(),
        }
    }
}

impl fmt::Display for SchoolScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.org_id, self.academic_year, self.school_level)
    }
}

// ==========================================
// Statut d'un membre de l'annuaire
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TeacherStatus {
    Active,
    Inactive,
}

impl TeacherStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TeacherStatus::Active => "active",
            TeacherStatus::Inactive => "inactive",
        }
    }
}

impl FromStr for TeacherStatus {
    type Err = crate::domain::types::ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(TeacherStatus::Active),
            "inactive" => Ok(TeacherStatus::Inactive),
            other => Err(crate::domain::types::ParseEnumError {
                kind: "TeacherStatus",
                value: other.to_string(),
            }),
        }
    }
}

// ==========================================
// TeacherRecord - entrée de l'annuaire
// ==========================================
// Collaborateur lecture seule: le coeur vérifie l'existence, le rôle
// et le statut, il ne gère pas le CRUD de l'annuaire.
// L'ordre d'insertion (rowid) définit la séquence de rotation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeacherRecord {
    pub teacher_id: String,
    pub scope: SchoolScope,
    pub full_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub role: Role,
    pub status: TeacherStatus,
    pub created_at: NaiveDateTime,
}

impl TeacherRecord {
    pub fn is_active(&self) -> bool {
        self.status == TeacherStatus::Active
    }
}
