//! Display font resolution for the chart renderer.
//!
//! Charts are drawn by `plotters`, which looks fonts up by family name through
//! the host's font configuration. This module decides which family name to
//! hand over. The installed-font inventory and the provisioning step sit behind
//! traits so the resolver can be exercised without touching the host.

use std::collections::BTreeSet;
use std::process::Command;

use log::{debug, info, warn};

/// Generic family used when no preferred or locale-matching font is installed.
pub const FALLBACK_CHART_FAMILY: &str = "sans-serif";

/// Source of installed font family names.
pub trait FontInventory {
    /// Returns every installed family name.
    fn families(&self) -> Vec<String>;
}

/// Result of a font provisioning attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProvisionOutcome {
    /// The install and cache refresh commands succeeded.
    Installed,
    /// A command could not run or exited unsuccessfully.
    Failed(String),
    /// Provisioning was disabled for this run.
    Skipped,
}

impl ProvisionOutcome {
    /// Returns `true` when new fonts may have been installed.
    pub fn succeeded(&self) -> bool {
        matches!(self, Self::Installed)
    }
}

/// Best-effort installer for a locale font package.
pub trait FontProvisioner {
    /// Attempts to install fonts. Must not panic; failures are reported in the outcome.
    fn provision(&mut self) -> ProvisionOutcome;
}

/// The chart font picked for this run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChartFont {
    /// A family from the preference list.
    Preferred(String),
    /// An installed family matched through a locale hint.
    LocaleMatch(String),
    /// Nothing suitable was found.
    Fallback,
}

impl ChartFont {
    /// Family name to pass to the chart backend.
    pub fn family(&self) -> &str {
        match self {
            Self::Preferred(name) | Self::LocaleMatch(name) => name,
            Self::Fallback => FALLBACK_CHART_FAMILY,
        }
    }

    /// Returns `true` when no suitable font was found.
    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback)
    }
}

/// Lists installed families with `fc-list`. An unavailable `fc-list` yields an empty list.
#[derive(Clone, Copy, Debug, Default)]
pub struct FontconfigInventory;

impl FontInventory for FontconfigInventory {
    fn families(&self) -> Vec<String> {
        match Command::new("fc-list").args([":", "family"]).output() {
            Ok(output) if output.status.success() => {
                parse_fc_list(&String::from_utf8_lossy(&output.stdout))
            }
            Ok(output) => {
                debug!("fc-list exited with {}", output.status);
                Vec::new()
            }
            Err(err) => {
                debug!("fc-list unavailable: {}", err);
                Vec::new()
            }
        }
    }
}

/// Splits `fc-list : family` output into distinct family names.
///
/// Each line may carry several comma-separated aliases for one face.
pub fn parse_fc_list(output: &str) -> Vec<String> {
    output
        .lines()
        .flat_map(|line| line.split(','))
        .map(|name| name.trim().replace("\\-", "-"))
        .filter(|name| !name.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Installs the Nanum font package through the system package manager.
#[derive(Clone, Debug)]
pub struct AptProvisioner {
    package: String,
}

impl Default for AptProvisioner {
    fn default() -> Self {
        Self::new("fonts-nanum")
    }
}

impl AptProvisioner {
    /// Creates a provisioner for the given package.
    pub fn new(package: impl Into<String>) -> Self {
        Self {
            package: package.into(),
        }
    }

    fn run(script: &str) -> Result<(), String> {
        let status = Command::new("bash")
            .args(["-lc", script])
            .status()
            .map_err(|err| format!("failed to spawn `{}`: {}", script, err))?;
        if status.success() {
            Ok(())
        } else {
            Err(format!("`{}` exited with {}", script, status))
        }
    }
}

impl FontProvisioner for AptProvisioner {
    fn provision(&mut self) -> ProvisionOutcome {
        let install = format!(
            "apt-get update -y && apt-get install -y {}",
            self.package
        );
        match Self::run(&install).and_then(|()| Self::run("fc-cache -f")) {
            Ok(()) => ProvisionOutcome::Installed,
            Err(reason) => ProvisionOutcome::Failed(reason),
        }
    }
}

/// Provisioner used when installation is disabled.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoProvisioner;

impl FontProvisioner for NoProvisioner {
    fn provision(&mut self) -> ProvisionOutcome {
        ProvisionOutcome::Skipped
    }
}

/// Resolves a chart font from a preference list with a provisioning fallback.
///
/// The inventory is scanned lazily and cached on the resolver; a successful
/// provisioning step invalidates the cache.
pub struct FontResolver<I, P> {
    inventory: I,
    provisioner: P,
    cached: Option<Vec<String>>,
    provisioned: Option<ProvisionOutcome>,
}

impl<I: FontInventory, P: FontProvisioner> FontResolver<I, P> {
    /// Creates a resolver over the given inventory and provisioner.
    pub fn new(inventory: I, provisioner: P) -> Self {
        Self {
            inventory,
            provisioner,
            cached: None,
            provisioned: None,
        }
    }

    /// Outcome of the provisioning attempt, if one was made.
    pub fn provision_outcome(&self) -> Option<&ProvisionOutcome> {
        self.provisioned.as_ref()
    }

    fn installed(&mut self) -> &[String] {
        let inventory = &self.inventory;
        self.cached.get_or_insert_with(|| inventory.families())
    }

    fn find_preferred<S: AsRef<str>>(&mut self, preferences: &[S]) -> Option<String> {
        let installed = self.installed();
        preferences
            .iter()
            .map(AsRef::as_ref)
            .find(|wanted| installed.iter().any(|family| family == wanted))
            .map(str::to_owned)
    }

    /// Returns the first installed preferred family, provisioning once if none is found,
    /// then any installed family whose lowercased name contains one of `locale_hints`.
    pub fn resolve<S: AsRef<str>>(&mut self, preferences: &[S], locale_hints: &[S]) -> ChartFont {
        if let Some(family) = self.find_preferred(preferences) {
            info!("Chart font: '{}'", family);
            return ChartFont::Preferred(family);
        }

        if self.provisioned.is_none() {
            let outcome = self.provisioner.provision();
            match &outcome {
                ProvisionOutcome::Installed => {
                    info!("Font package installed; rescanning font inventory");
                    self.cached = None;
                }
                ProvisionOutcome::Failed(reason) => {
                    warn!("Font provisioning failed: {}", reason)
                }
                ProvisionOutcome::Skipped => debug!("Font provisioning skipped"),
            }
            self.provisioned = Some(outcome);
        }

        if let Some(family) = self.find_preferred(preferences) {
            info!("Chart font after provisioning: '{}'", family);
            return ChartFont::Preferred(family);
        }

        let hints: Vec<String> = locale_hints
            .iter()
            .map(|hint| hint.as_ref().to_lowercase())
            .collect();
        let matched = self.installed().iter().find(|family| {
            let lowered = family.to_lowercase();
            hints.iter().any(|hint| lowered.contains(hint.as_str()))
        });

        match matched {
            Some(family) => {
                info!("Chart font matched by locale hint: '{}'", family);
                ChartFont::LocaleMatch(family.clone())
            }
            None => {
                warn!(
                    "No locale font installed; charts fall back to '{}'",
                    FALLBACK_CHART_FAMILY
                );
                ChartFont::Fallback
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    #[derive(Clone, Default)]
    struct FakeInventory {
        families: Rc<RefCell<Vec<String>>>,
        scans: Rc<Cell<usize>>,
    }

    impl FakeInventory {
        fn with(families: &[&str]) -> Self {
            let inventory = Self::default();
            inventory.set(families);
            inventory
        }

        fn set(&self, families: &[&str]) {
            *self.families.borrow_mut() = families.iter().map(|f| f.to_string()).collect();
        }
    }

    impl FontInventory for FakeInventory {
        fn families(&self) -> Vec<String> {
            self.scans.set(self.scans.get() + 1);
            self.families.borrow().clone()
        }
    }

    struct InstallingProvisioner {
        inventory: FakeInventory,
        installs: &'static [&'static str],
        calls: usize,
    }

    impl FontProvisioner for InstallingProvisioner {
        fn provision(&mut self) -> ProvisionOutcome {
            self.calls += 1;
            self.inventory.set(self.installs);
            ProvisionOutcome::Installed
        }
    }

    struct FailingProvisioner;

    impl FontProvisioner for FailingProvisioner {
        fn provision(&mut self) -> ProvisionOutcome {
            ProvisionOutcome::Failed("apt-get not found".into())
        }
    }

    const PREFERENCES: &[&str] = &["NanumGothic", "Malgun Gothic"];
    const HINTS: &[&str] = &["nanum", "noto", "gothic"];

    #[test]
    fn picks_first_installed_preference_in_order() {
        let inventory = FakeInventory::with(&["DejaVu Sans", "Malgun Gothic", "NanumGothic"]);
        let mut resolver = FontResolver::new(inventory, NoProvisioner);

        let font = resolver.resolve(PREFERENCES, HINTS);
        assert_eq!(font, ChartFont::Preferred("NanumGothic".into()));
        assert_eq!(resolver.provision_outcome(), None);
    }

    #[test]
    fn provisions_and_rescans_when_nothing_matches() {
        let inventory = FakeInventory::with(&["DejaVu Sans"]);
        let provisioner = InstallingProvisioner {
            inventory: inventory.clone(),
            installs: &["DejaVu Sans", "NanumGothic"],
            calls: 0,
        };
        let mut resolver = FontResolver::new(inventory.clone(), provisioner);

        let font = resolver.resolve(PREFERENCES, HINTS);
        assert_eq!(font, ChartFont::Preferred("NanumGothic".into()));
        assert_eq!(inventory.scans.get(), 2);
        assert!(resolver.provision_outcome().unwrap().succeeded());
    }

    #[test]
    fn failed_provisioning_falls_through_to_locale_hint() {
        let inventory = FakeInventory::with(&["DejaVu Sans", "Noto Sans KR"]);
        let mut resolver = FontResolver::new(inventory, FailingProvisioner);

        let font = resolver.resolve(PREFERENCES, HINTS);
        assert_eq!(font, ChartFont::LocaleMatch("Noto Sans KR".into()));
        assert!(matches!(
            resolver.provision_outcome(),
            Some(ProvisionOutcome::Failed(_))
        ));
    }

    #[test]
    fn nothing_installed_yields_fallback() {
        let mut resolver = FontResolver::new(FakeInventory::with(&[]), NoProvisioner);

        let font = resolver.resolve(PREFERENCES, HINTS);
        assert!(font.is_fallback());
        assert_eq!(font.family(), FALLBACK_CHART_FAMILY);
        assert_eq!(resolver.provision_outcome(), Some(&ProvisionOutcome::Skipped));
    }

    #[test]
    fn provisioning_runs_at_most_once_and_inventory_is_cached() {
        let inventory = FakeInventory::with(&["DejaVu Sans"]);
        let provisioner = InstallingProvisioner {
            inventory: inventory.clone(),
            installs: &["DejaVu Sans"],
            calls: 0,
        };
        let mut resolver = FontResolver::new(inventory.clone(), provisioner);

        assert!(resolver.resolve(PREFERENCES, HINTS).is_fallback());
        assert!(resolver.resolve(PREFERENCES, HINTS).is_fallback());
        assert_eq!(resolver.provisioner.calls, 1);
        assert_eq!(inventory.scans.get(), 2);
    }

    #[test]
    fn parses_fc_list_aliases() {
        let output = "Noto Sans CJK KR,Noto Sans CJK KR Regular\nDejaVu Sans\n\nNanumGothic\nDejaVu Sans\n";
        assert_eq!(
            parse_fc_list(output),
            vec![
                "DejaVu Sans",
                "NanumGothic",
                "Noto Sans CJK KR",
                "Noto Sans CJK KR Regular"
            ]
        );
    }
}
