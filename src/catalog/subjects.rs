use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Subject {
    pub id: &'static str,
    pub name: &'static str,
    pub category: &'static str,
}

const SUBJECTS: &[Subject] = &[
    Subject { id: "algebra", name: "Algebra", category: "Mathematics" },
    Subject { id: "geometry", name: "Geometry", category: "Mathematics" },
    Subject { id: "calculus", name: "Calculus", category: "Mathematics" },
    Subject { id: "statistics", name: "Statistics", category: "Mathematics" },
    Subject { id: "biology", name: "Biology", category: "Science" },
    Subject { id: "chemistry", name: "Chemistry", category: "Science" },
    Subject { id: "physics", name: "Physics", category: "Science" },
    Subject { id: "english-writing", name: "English Writing", category: "Languages" },
    Subject { id: "spanish", name: "Spanish", category: "Languages" },
    Subject { id: "french", name: "French", category: "Languages" },
    Subject { id: "computer-science", name: "Computer Science", category: "Technology" },
    Subject { id: "sat", name: "SAT", category: "Test Prep" },
    Subject { id: "act", name: "ACT", category: "Test Prep" },
    Subject { id: "college-admissions", name: "College Admissions", category: "Counseling" },
];

pub fn all() -> &'static [Subject] {
    SUBJECTS
}

/// Lookup by id or by display name, case-insensitively.
pub fn find(key: &str) -> Option<&'static Subject> {
    SUBJECTS
        .iter()
        .find(|s| s.id.eq_ignore_ascii_case(key) || s.name.eq_ignore_ascii_case(key))
}

/// Subjects grouped by category, categories in first-seen order.
pub fn grouped() -> Vec<(&'static str, Vec<&'static Subject>)> {
    let mut groups: Vec<(&'static str, Vec<&'static Subject>)> = Vec::new();
    for subject in SUBJECTS {
        match groups.iter_mut().find(|(category, _)| *category == subject.category) {
            Some((_, members)) => members.push(subject),
            None => groups.push((subject.category, vec![subject])),
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_matches_id_or_name() {
        assert_eq!(find("Calculus").map(|s| s.id), Some("calculus"));
        assert_eq!(find("english-writing").map(|s| s.name), Some("English Writing"));
        assert!(find("astrology").is_none());
    }

    #[test]
    fn grouping_keeps_every_subject_once() {
        let total: usize = grouped().iter().map(|(_, members)| members.len()).sum();
        assert_eq!(total, all().len());
        assert_eq!(grouped()[0].0, "Mathematics");
    }
}
