// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Sibling name disambiguation

use crate::entry::EntryId;
use std::collections::{HashMap, HashSet};

/// Turns a remote title into a legal path segment.
pub fn sanitize(title: &str) -> String {
    match title {
        "" | "." | ".." => format!("_{title}"),
        _ => title.replace('/', "_"),
    }
}

/// Disambiguated names of one folder's children.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FolderNames {
    /// (name, id) in registration order
    ordered: Vec<(String, EntryId)>,
    by_name: HashMap<String, usize>,
}

impl FolderNames {
    /// Assigns names to `children`, which must already be in registration order.
    ///
    /// The first child with a given title keeps it bare; later ones get
    /// `-2`, `-3`, ... skipping any suffix another sibling already owns as
    /// its real title.
    pub fn assign<'a, I>(children: I) -> Self
    where
        I: IntoIterator<Item = (&'a EntryId, &'a str)>,
    {
        let children: Vec<(&EntryId, String)> = children
            .into_iter()
            .map(|(id, title)| (id, sanitize(title)))
            .collect();

        // Every sibling's real title, so a suffix never claims a name like `x-2`
        // that belongs to the sibling actually titled `x-2`
        let bare: HashSet<&str> = children.iter().map(|(_, t)| t.as_str()).collect();
        let mut taken: HashSet<String> = HashSet::with_capacity(children.len());
        let mut next_suffix: HashMap<&str, u32> = HashMap::new();
        let mut ordered = Vec::with_capacity(children.len());

        for (id, title) in &children {
            let name = if taken.contains(title) {
                let n = next_suffix.entry(title.as_str()).or_insert(2);
                loop {
                    let candidate = format!("{title}-{n}");
                    *n += 1;
                    if !bare.contains(candidate.as_str()) && !taken.contains(&candidate) {
                        break candidate;
                    }
                }
            } else {
                title.clone()
            };
            _ = taken.insert(name.clone());
            ordered.push((name, (*id).clone()));
        }

        let by_name = ordered
            .iter()
            .enumerate()
            .map(|(i, (name, _))| (name.clone(), i))
            .collect();
        Self { ordered, by_name }
    }

    pub fn lookup(&self, name: &str) -> Option<&EntryId> {
        self.by_name.get(name).map(|&i| &self.ordered[i].1)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.ordered.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &EntryId)> {
        self.ordered.iter().map(|(name, id)| (name.as_str(), id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assign(kids: &[(&str, &str)]) -> FolderNames {
        let owned: Vec<(EntryId, &str)> = kids.iter().map(|(id, t)| (EntryId::new(*id), *t)).collect();
        FolderNames::assign(owned.iter().map(|(id, t)| (id, *t)))
    }

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize("a/b"), "a_b");
        assert_eq!(sanitize(""), "_");
        assert_eq!(sanitize(".."), "_..");
        assert_eq!(sanitize("report.pdf"), "report.pdf");
    }

    #[test]
    fn test_duplicates_get_suffixes() {
        let names = assign(&[("E1", "report"), ("E2", "report"), ("E3", "notes"), ("E4", "report")]);
        assert_eq!(
            names.names().collect::<Vec<_>>(),
            vec!["report", "report-2", "notes", "report-3"]
        );
        assert_eq!(names.lookup("report-2").map(EntryId::as_str), Some("E2"));
        assert_eq!(names.lookup("report-4"), None);
    }

    #[test]
    fn test_suffix_skips_real_titles() {
        let names = assign(&[("E1", "x"), ("E2", "x"), ("E3", "x-2")]);
        assert_eq!(names.names().collect::<Vec<_>>(), vec!["x", "x-3", "x-2"]);
        assert_eq!(names.lookup("x-2").map(EntryId::as_str), Some("E3"));
    }

    #[test]
    fn test_assignment_is_deterministic() {
        let kids = [("E1", "a"), ("E2", "a"), ("E3", "a")];
        assert_eq!(assign(&kids), assign(&kids));
    }
}
