use crate::policy::OverloadDescriptor;
use tracing::{debug, info};

/// Finds every overload of an operation by exact name.
///
/// Parameter and return kinds are deliberately not used for filtering, so an
/// unrelated overload that shares the name is matched too.
pub struct OverloadResolver;

impl OverloadResolver {
    pub fn resolve(name: &str, catalog: &[OverloadDescriptor]) -> Vec<OverloadDescriptor> {
        let matches: Vec<OverloadDescriptor> = catalog
            .iter()
            .filter(|descriptor| descriptor.name == name)
            .cloned()
            .collect();

        if matches.is_empty() {
            info!("No overloads of {}() found in this runtime", name);
        } else {
            debug!("Resolved {} overload(s) of {}()", matches.len(), name);
        }

        matches
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::{ParamKind, ReturnKind};

    fn catalog() -> Vec<OverloadDescriptor> {
        vec![
            OverloadDescriptor::new("Dpm", "lockNow", vec![], ReturnKind::Void),
            OverloadDescriptor::new("Dpm", "lockNow", vec![ParamKind::Int], ReturnKind::Void),
            OverloadDescriptor::new("Dpm", "wipeData", vec![ParamKind::Int], ReturnKind::Void),
            OverloadDescriptor::new("Dpm", "isAdminActive", vec![], ReturnKind::Boolean),
        ]
    }

    #[test]
    fn test_resolves_all_overloads() {
        let found = OverloadResolver::resolve("lockNow", &catalog());
        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|d| d.name == "lockNow"));
    }

    #[test]
    fn test_missing_name_is_empty() {
        assert!(OverloadResolver::resolve("wipeDevice", &catalog()).is_empty());
        assert!(OverloadResolver::resolve("lockNow", &[]).is_empty());
    }

    #[test]
    fn test_match_is_exact() {
        assert!(OverloadResolver::resolve("lock", &catalog()).is_empty());
        assert!(OverloadResolver::resolve("LOCKNOW", &catalog()).is_empty());
    }

    #[test]
    fn test_ignores_signature_shape() {
        let catalog = vec![
            OverloadDescriptor::new("Dpm", "wipeData", vec![], ReturnKind::Void),
            OverloadDescriptor::new("Dpm", "wipeData", vec![ParamKind::String], ReturnKind::Boolean),
        ];
        assert_eq!(OverloadResolver::resolve("wipeData", &catalog).len(), 2);
    }
}
