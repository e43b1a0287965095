//! Input state of the create/import and clone dialogs.

use shared::domain::ManifestFile;

use crate::actions::{clone_default_name, ActionRequest};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CreateTab {
    #[default]
    Create,
    Import,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateForm {
    pub tab: CreateTab,
    pub name: String,
    pub runtime_version: String,
    pub manifest: Option<ManifestFile>,
}

impl CreateForm {
    pub fn new(default_runtime_version: impl Into<String>) -> Self {
        Self {
            tab: CreateTab::default(),
            name: String::new(),
            runtime_version: default_runtime_version.into(),
            manifest: None,
        }
    }

    /// Only requirements lists need an interpreter version; descriptors carry their own.
    pub fn offers_runtime_version(&self) -> bool {
        match self.tab {
            CreateTab::Create => true,
            CreateTab::Import => self
                .manifest
                .as_ref()
                .is_some_and(ManifestFile::is_requirements_list),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.to_request().is_some()
    }

    /// `None` while a required field is still missing.
    pub fn to_request(&self) -> Option<ActionRequest> {
        let name = self.name.trim();
        match self.tab {
            CreateTab::Create => {
                let runtime_version = self.runtime_version.trim();
                if name.is_empty() || runtime_version.is_empty() {
                    return None;
                }
                Some(ActionRequest::Create {
                    name: name.to_string(),
                    runtime_version: runtime_version.to_string(),
                })
            }
            CreateTab::Import => {
                let manifest = self.manifest.clone().filter(|m| !m.is_missing())?;
                let runtime_version = self
                    .offers_runtime_version()
                    .then(|| self.runtime_version.trim().to_string())
                    .filter(|v| !v.is_empty());
                Some(ActionRequest::Import {
                    manifest,
                    name: (!name.is_empty()).then(|| name.to_string()),
                    runtime_version,
                })
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloneForm {
    pub source: String,
    pub new_name: String,
}

impl CloneForm {
    /// Pre-fills the target name from the source.
    pub fn open(source: impl Into<String>) -> Self {
        let source = source.into();
        Self {
            new_name: clone_default_name(&source),
            source,
        }
    }

    pub fn to_request(&self) -> Option<ActionRequest> {
        let new_name = self.new_name.trim();
        if new_name.is_empty() {
            return None;
        }
        Some(ActionRequest::Clone {
            source: self.source.clone(),
            new_name: new_name.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_needs_name_and_version() {
        let mut form = CreateForm::new("3.9");
        assert_eq!(form.to_request(), None);

        form.name = " envA ".into();
        assert_eq!(
            form.to_request(),
            Some(ActionRequest::Create {
                name: "envA".into(),
                runtime_version: "3.9".into(),
            })
        );

        form.runtime_version.clear();
        assert!(!form.is_complete());
    }

    #[test]
    fn import_without_file_is_incomplete() {
        let mut form = CreateForm::new("3.9");
        form.tab = CreateTab::Import;
        form.name = "fromfile".into();
        assert_eq!(form.to_request(), None);
    }

    #[test]
    fn descriptor_import_omits_runtime_version() {
        let mut form = CreateForm::new("3.9");
        form.tab = CreateTab::Import;
        form.manifest = Some(ManifestFile::new("environment.yml", "name: x\n"));

        assert!(!form.offers_runtime_version());
        assert_eq!(
            form.to_request(),
            Some(ActionRequest::Import {
                manifest: ManifestFile::new("environment.yml", "name: x\n"),
                name: None,
                runtime_version: None,
            })
        );
    }

    #[test]
    fn zero_byte_import_is_still_submittable() {
        let mut form = CreateForm::new("3.9");
        form.tab = CreateTab::Import;
        form.manifest = Some(ManifestFile::new("environment.yml", Vec::new()));

        let request = form.to_request().expect("request");
        assert_eq!(request.validate(), Ok(()));
    }

    #[test]
    fn requirements_import_carries_runtime_version() {
        let mut form = CreateForm::new("3.11");
        form.tab = CreateTab::Import;
        form.name = "reqs".into();
        form.manifest = Some(ManifestFile::new("requirements.TXT", "numpy\n"));

        match form.to_request() {
            Some(ActionRequest::Import {
                name,
                runtime_version,
                ..
            }) => {
                assert_eq!(name.as_deref(), Some("reqs"));
                assert_eq!(runtime_version.as_deref(), Some("3.11"));
            }
            other => panic!("unexpected request: {other:?}"),
        }
    }

    #[test]
    fn clone_form_prefills_until_edited() {
        let mut form = CloneForm::open("myenv");
        assert_eq!(form.new_name, "myenv_clone");

        form.new_name = "other".into();
        assert_eq!(
            form.to_request(),
            Some(ActionRequest::Clone {
                source: "myenv".into(),
                new_name: "other".into(),
            })
        );

        form.new_name = "   ".into();
        assert_eq!(form.to_request(), None);
    }
}
