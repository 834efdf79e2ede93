//! Host platform detection.
//!
//! Recipes branch on a `PlatformKey` (e.g. `linux_ubuntu`, `darwin`), so the
//! detector maps the running host to exactly one key. Detection runs once per
//! invocation and the result is passed into the installer manager explicitly;
//! there is no process-wide cache to keep tests honest with synthetic
//! platforms.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, ToolupError};

/// Operating system family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OsFamily {
    Linux,
    Darwin,
    Windows,
}

impl fmt::Display for OsFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OsFamily::Linux => write!(f, "linux"),
            OsFamily::Darwin => write!(f, "darwin"),
            OsFamily::Windows => write!(f, "windows"),
        }
    }
}

/// Recipe branch identifier.
///
/// Every recipe keys its shell steps by one of these. Unknown Linux distros
/// resolve to `LinuxGeneric` so a recipe can still offer a portable branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlatformKey {
    LinuxUbuntu,
    LinuxCentos,
    LinuxArch,
    LinuxGeneric,
    Darwin,
    Windows,
}

impl PlatformKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlatformKey::LinuxUbuntu => "linux_ubuntu",
            PlatformKey::LinuxCentos => "linux_centos",
            PlatformKey::LinuxArch => "linux_arch",
            PlatformKey::LinuxGeneric => "linux_generic",
            PlatformKey::Darwin => "darwin",
            PlatformKey::Windows => "windows",
        }
    }
}

impl fmt::Display for PlatformKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Immutable description of the running host.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformInfo {
    pub family: OsFamily,
    /// Linux distribution id (`ubuntu`, `centos`, `arch`, ...), when known.
    pub distro: Option<String>,
    pub arch: String,
}

impl PlatformInfo {
    /// Detect the running host.
    ///
    /// Fails only when the OS family itself is unrecognized. An unknown
    /// Linux distribution is not an error; `distro` is left empty and the
    /// platform resolves to the generic Linux key.
    pub fn detect() -> Result<Self> {
        let family = match std::env::consts::OS {
            "linux" => OsFamily::Linux,
            "macos" => OsFamily::Darwin,
            "windows" => OsFamily::Windows,
            other => {
                return Err(ToolupError::Detection(format!(
                    "unsupported operating system '{}'",
                    other
                )))
            }
        };

        let distro = if family == OsFamily::Linux {
            std::fs::read_to_string("/etc/os-release")
                .ok()
                .and_then(|content| parse_os_release_id(&content))
        } else {
            None
        };

        Ok(Self {
            family,
            distro,
            arch: std::env::consts::ARCH.to_string(),
        })
    }

    /// The recipe branch this host resolves against.
    pub fn key(&self) -> PlatformKey {
        match self.family {
            OsFamily::Darwin => PlatformKey::Darwin,
            OsFamily::Windows => PlatformKey::Windows,
            OsFamily::Linux => match self.distro.as_deref() {
                Some("ubuntu") | Some("debian") | Some("pop") | Some("linuxmint") => {
                    PlatformKey::LinuxUbuntu
                }
                Some("centos") | Some("rhel") | Some("fedora") | Some("rocky")
                | Some("almalinux") => PlatformKey::LinuxCentos,
                Some("arch") | Some("manjaro") | Some("endeavouros") => PlatformKey::LinuxArch,
                _ => PlatformKey::LinuxGeneric,
            },
        }
    }

    /// Human-readable summary for headers and logs.
    pub fn describe(&self) -> String {
        match &self.distro {
            Some(distro) => format!("{} ({}) {}", self.family, distro, self.arch),
            None => format!("{} {}", self.family, self.arch),
        }
    }
}

/// Extract the `ID=` field from `/etc/os-release` content.
///
/// Best-effort: returns `None` rather than failing when the field is absent
/// or the file is malformed.
fn parse_os_release_id(content: &str) -> Option<String> {
    for line in content.lines() {
        let line = line.trim();
        if let Some(value) = line.strip_prefix("ID=") {
            let value = value.trim_matches('"').trim_matches('\'').trim();
            if !value.is_empty() {
                return Some(value.to_lowercase());
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linux(distro: Option<&str>) -> PlatformInfo {
        PlatformInfo {
            family: OsFamily::Linux,
            distro: distro.map(|s| s.to_string()),
            arch: "x86_64".to_string(),
        }
    }

    #[test]
    fn test_parse_os_release_ubuntu() {
        let content = r#"
NAME="Ubuntu"
VERSION="24.04 LTS (Noble Numbat)"
ID=ubuntu
ID_LIKE=debian
"#;
        assert_eq!(parse_os_release_id(content), Some("ubuntu".to_string()));
    }

    #[test]
    fn test_parse_os_release_quoted() {
        assert_eq!(
            parse_os_release_id("ID=\"centos\"\nVERSION_ID=\"7\""),
            Some("centos".to_string())
        );
    }

    #[test]
    fn test_parse_os_release_missing_id() {
        assert_eq!(parse_os_release_id("NAME=Something\nVERSION=1"), None);
        assert_eq!(parse_os_release_id(""), None);
        assert_eq!(parse_os_release_id("ID="), None);
    }

    #[test]
    fn test_key_mapping_known_distros() {
        assert_eq!(linux(Some("ubuntu")).key(), PlatformKey::LinuxUbuntu);
        assert_eq!(linux(Some("debian")).key(), PlatformKey::LinuxUbuntu);
        assert_eq!(linux(Some("centos")).key(), PlatformKey::LinuxCentos);
        assert_eq!(linux(Some("fedora")).key(), PlatformKey::LinuxCentos);
        assert_eq!(linux(Some("arch")).key(), PlatformKey::LinuxArch);
    }

    #[test]
    fn test_key_mapping_unknown_distro_falls_back() {
        assert_eq!(linux(Some("nixos")).key(), PlatformKey::LinuxGeneric);
        assert_eq!(linux(None).key(), PlatformKey::LinuxGeneric);
    }

    #[test]
    fn test_key_mapping_non_linux() {
        let mac = PlatformInfo {
            family: OsFamily::Darwin,
            distro: None,
            arch: "aarch64".to_string(),
        };
        assert_eq!(mac.key(), PlatformKey::Darwin);

        let win = PlatformInfo {
            family: OsFamily::Windows,
            distro: None,
            arch: "x86_64".to_string(),
        };
        assert_eq!(win.key(), PlatformKey::Windows);
    }

    #[test]
    fn test_platform_key_serde_strings() {
        assert_eq!(
            serde_yaml::to_string(&PlatformKey::LinuxUbuntu).unwrap().trim(),
            "linux_ubuntu"
        );
        let key: PlatformKey = serde_yaml::from_str("darwin").unwrap();
        assert_eq!(key, PlatformKey::Darwin);
    }

    #[test]
    fn test_detect_on_this_host() {
        // The test host is one of the three supported families, so detection
        // must succeed and produce a usable key.
        let info = PlatformInfo::detect().unwrap();
        assert!(!info.arch.is_empty());
        let _ = info.key();
    }

    #[test]
    fn test_describe() {
        assert_eq!(linux(Some("ubuntu")).describe(), "linux (ubuntu) x86_64");
        assert_eq!(linux(None).describe(), "linux x86_64");
    }
}
