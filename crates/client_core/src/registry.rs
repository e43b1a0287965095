//! Client-side source of truth for environments and the open package view.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use shared::domain::{Environment, Package};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    #[default]
    Name,
    Path,
    RuntimeVersion,
    Size,
    LastModified,
}

impl SortKey {
    pub const ALL: [SortKey; 5] = [
        SortKey::Name,
        SortKey::Path,
        SortKey::RuntimeVersion,
        SortKey::Size,
        SortKey::LastModified,
    ];

    pub fn label(self) -> &'static str {
        match self {
            SortKey::Name => "Name",
            SortKey::Path => "Path",
            SortKey::RuntimeVersion => "Python",
            SortKey::Size => "Size",
            SortKey::LastModified => "Last modified",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

impl SortOrder {
    pub fn flipped(self) -> Self {
        match self {
            SortOrder::Ascending => SortOrder::Descending,
            SortOrder::Descending => SortOrder::Ascending,
        }
    }

    fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            SortOrder::Ascending => ordering,
            SortOrder::Descending => ordering.reverse(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SortState {
    pub key: SortKey,
    pub order: SortOrder,
}

impl SortState {
    /// Same column flips the order; a new column starts ascending.
    pub fn toggle(&mut self, key: SortKey) {
        if self.key == key {
            self.order = self.order.flipped();
        } else {
            self.key = key;
            self.order = SortOrder::Ascending;
        }
    }
}

fn compare_case_insensitive(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase())
}

fn compare_by(key: SortKey, a: &Environment, b: &Environment) -> Ordering {
    match key {
        SortKey::Name => compare_case_insensitive(&a.name, &b.name),
        SortKey::Path => compare_case_insensitive(&a.path, &b.path),
        SortKey::RuntimeVersion => compare_case_insensitive(&a.runtime_version, &b.runtime_version),
        SortKey::Size => a.size_bytes().cmp(&b.size_bytes()),
        SortKey::LastModified => compare_case_insensitive(&a.last_modified, &b.last_modified),
    }
}

/// Ordered projection of `environments` for display. The input is untouched.
pub fn sorted_view(environments: &[Environment], key: SortKey, order: SortOrder) -> Vec<&Environment> {
    let mut view: Vec<&Environment> = environments.iter().collect();
    view.sort_by(|a, b| order.apply(compare_by(key, a, b)));
    view
}

/// Packages whose name contains `query`, ignoring case. An empty query keeps everything.
pub fn filtered_view<'a>(packages: &'a [Package], query: &str) -> Vec<&'a Package> {
    let needle = query.trim().to_lowercase();
    packages
        .iter()
        .filter(|package| needle.is_empty() || package.name.to_lowercase().contains(&needle))
        .collect()
}

#[derive(Debug, Clone)]
pub struct PackageView {
    pub env: String,
    pub packages: Vec<Package>,
    pub loading: bool,
}

#[derive(Debug, Default)]
pub struct EnvironmentRegistry {
    environments: Vec<Environment>,
    loaded: bool,
    open: Option<PackageView>,
}

impl EnvironmentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn environments(&self) -> &[Environment] {
        &self.environments
    }

    /// False until the first successful listing arrives.
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn replace_environments(&mut self, environments: Vec<Environment>) {
        self.environments = environments;
        self.loaded = true;
    }

    pub fn sorted(&self, sort: SortState) -> Vec<&Environment> {
        sorted_view(&self.environments, sort.key, sort.order)
    }

    pub fn package_view(&self) -> Option<&PackageView> {
        self.open.as_ref()
    }

    /// Opens the package view for `env`, discarding any other environment's packages.
    pub fn open_packages(&mut self, env: &str) {
        if let Some(view) = self.open.as_mut().filter(|view| view.env == env) {
            view.loading = true;
            return;
        }
        self.open = Some(PackageView {
            env: env.to_string(),
            packages: Vec::new(),
            loading: true,
        });
    }

    /// Replaces the open view's packages. Returns false when `env` is no longer open.
    pub fn replace_packages(&mut self, env: &str, packages: Vec<Package>) -> bool {
        match &mut self.open {
            Some(view) if view.env == env => {
                view.packages = packages;
                view.loading = false;
                true
            }
            _ => false,
        }
    }

    /// Ends loading without touching the current list, e.g. after a failed refresh.
    pub fn settle_packages(&mut self, env: &str) {
        if let Some(view) = &mut self.open {
            if view.env == env {
                view.loading = false;
            }
        }
    }

    pub fn close_packages(&mut self) {
        self.open = None;
    }
}

#[cfg(test)]
#[path = "tests/registry_tests.rs"]
mod tests;
