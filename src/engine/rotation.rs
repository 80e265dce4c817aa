// ==========================================
// Scolaris - Moteur de rotation
// ==========================================
// Calcul pur du prochain semainier: rotation circulaire sur la liste
// des enseignants actifs, ordonnée par ordre d'insertion. Le moteur
// ne touche pas aux données; le choix du point de reprise (dernière
// affectation active) appartient à l'appelant.
// ==========================================

use crate::domain::duty::WeeklyDutyAssignment;
use crate::domain::teacher::TeacherRecord;

pub struct RotationEngine;

impl RotationEngine {
    pub fn new() -> Self {
        Self
    }

    /// Prochain enseignant de service.
    ///
    /// - Liste vide: None.
    /// - Pas d'affectation de reprise, ou son enseignant a quitté la
    ///   liste active: on repart du premier.
    /// - Sinon: le suivant en cercle, les affectations manuelles
    ///   comptant comme point de reprise au même titre que les
    ///   automatiques.
    pub fn next_assignee<'a>(
        &self,
        active_teachers: &'a [TeacherRecord],
        last_active: Option<&WeeklyDutyAssignment>,
    ) -> Option<&'a TeacherRecord> {
        if active_teachers.is_empty() {
            return None;
        }

        let next_index = match last_active {
            Some(last) => active_teachers
                .iter()
                .position(|t| t.teacher_id == last.teacher_id)
                .map(|i| (i + 1) % active_teachers.len())
                .unwrap_or(0),
            None => 0,
        };

        active_teachers.get(next_index)
    }
}

impl Default for RotationEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::teacher::{SchoolScope, TeacherStatus};
    use crate::domain::types::{AssignmentMode, Role};
    use chrono::{NaiveDate, Utc};

    fn teacher(id: &str) -> TeacherRecord {
        TeacherRecord {
            teacher_id: id.to_string(),
            scope: SchoolScope::new("org", "2025-2026", "COLLEGE"),
            full_name: format!("Enseignant {}", id),
            email: None,
            phone: None,
            role: Role::Teacher,
            status: TeacherStatus::Active,
            created_at: Utc::now().naive_utc(),
        }
    }

    fn assignment(teacher_id: &str, mode: AssignmentMode) -> WeeklyDutyAssignment {
        WeeklyDutyAssignment {
            assignment_id: "a-1".into(),
            scope: SchoolScope::new("org", "2025-2026", "COLLEGE"),
            teacher_id: teacher_id.to_string(),
            week_start_date: NaiveDate::from_ymd_opt(2026, 3, 9).unwrap(),
            week_end_date: NaiveDate::from_ymd_opt(2026, 3, 13).unwrap(),
            week_number: 11,
            assignment_mode: mode,
            is_active: true,
            assigned_by: None,
            reason: None,
            created_at: Utc::now().naive_utc(),
        }
    }

    #[test]
    fn test_first_assignment_takes_first_teacher() {
        let teachers = vec![teacher("A"), teacher("B"), teacher("C")];
        let engine = RotationEngine::new();
        let next = engine.next_assignee(&teachers, None).unwrap();
        assert_eq!(next.teacher_id, "A");
    }

    #[test]
    fn test_rotation_wraps_around() {
        let teachers = vec![teacher("A"), teacher("B"), teacher("C")];
        let engine = RotationEngine::new();
        let last = assignment("C", AssignmentMode::Auto);
        let next = engine.next_assignee(&teachers, Some(&last)).unwrap();
        assert_eq!(next.teacher_id, "A");
    }

    #[test]
    fn test_manual_assignment_participates_in_continuity() {
        let teachers = vec![teacher("A"), teacher("B"), teacher("C")];
        let engine = RotationEngine::new();
        // Dérogation manuelle sur A: la rotation reprend après A.
        let last = assignment("A", AssignmentMode::Manual);
        let next = engine.next_assignee(&teachers, Some(&last)).unwrap();
        assert_eq!(next.teacher_id, "B");
    }

    #[test]
    fn test_departed_teacher_resets_to_first() {
        let teachers = vec![teacher("A"), teacher("B")];
        let engine = RotationEngine::new();
        let last = assignment("Z", AssignmentMode::Auto);
        let next = engine.next_assignee(&teachers, Some(&last)).unwrap();
        assert_eq!(next.teacher_id, "A");
    }

    #[test]
    fn test_empty_roster_yields_none() {
        let engine = RotationEngine::new();
        assert!(engine.next_assignee(&[], None).is_none());
    }
}
