//! Media drive discovery.

use crate::models::config::VolumeConfig;
use crate::utils::fs::find_child_ignore_case;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Mount points never considered as media drives.
const SYSTEM_MOUNT_PREFIXES: &[&str] = &["/boot", "/sys", "/proc", "/dev", "/run", "/tmp", "/var/snap"];

/// Filesystems that never hold media.
const PSEUDO_FILESYSTEMS: &[&str] = &[
    "proc", "sysfs", "tmpfs", "devtmpfs", "devpts", "cgroup", "cgroup2", "pstore", "overlay",
    "squashfs",
];

/// Finds the media drive and watches that it stays attached.
pub trait VolumeManager: Send {
    /// Mount point of an attached media drive, if any.
    fn find_media_volume(&mut self) -> Option<PathBuf>;

    /// Whether the drive at `root` is still usable.
    fn is_still_connected(&mut self, root: &Path) -> bool;
}

/// Volume manager backed by the mount table and well-known mount roots.
#[derive(Debug, Clone)]
pub struct MountVolumeManager {
    config: VolumeConfig,
    mounts_file: PathBuf,
    user: String,
}

impl MountVolumeManager {
    pub fn new(config: VolumeConfig) -> Self {
        Self {
            config,
            mounts_file: PathBuf::from("/proc/mounts"),
            user: whoami::username(),
        }
    }

    /// Read mount points from another file (tests).
    pub fn with_mounts_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.mounts_file = path.into();
        self
    }

    /// Candidate roots in priority order, without duplicates.
    pub fn candidates(&self) -> Vec<PathBuf> {
        let mut candidates = Vec::new();

        if let Some(root) = &self.config.media_root {
            candidates.push(root.clone());
        }

        if let Ok(content) = std::fs::read_to_string(&self.mounts_file) {
            candidates.extend(parse_mounts(&content));
        }

        let mut parents = vec![
            PathBuf::from("/run/media").join(&self.user),
            PathBuf::from("/media").join(&self.user),
            PathBuf::from("/media"),
            PathBuf::from("/mnt"),
        ];
        parents.extend(self.config.search_roots.iter().cloned());

        for parent in parents {
            let Ok(entries) = std::fs::read_dir(&parent) else {
                continue;
            };
            let mut children: Vec<PathBuf> = entries
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| p.is_dir())
                .collect();
            children.sort();
            candidates.extend(children);
        }

        let mut unique = Vec::new();
        for candidate in candidates {
            if !unique.contains(&candidate) {
                unique.push(candidate);
            }
        }
        unique
    }

    fn run_mount_command(&self) {
        let Some((program, args)) = self.config.mount_command.as_ref().and_then(|c| c.split_first()) else {
            return;
        };

        match Command::new(program).args(args).status() {
            Ok(status) if status.success() => tracing::debug!("Mount command succeeded"),
            Ok(status) => tracing::warn!("Mount command {} failed: {}", program, status),
            Err(e) => tracing::warn!("Mount command {} could not run: {}", program, e),
        }
    }
}

impl VolumeManager for MountVolumeManager {
    fn find_media_volume(&mut self) -> Option<PathBuf> {
        self.run_mount_command();

        let found = self
            .candidates()
            .into_iter()
            .find(|root| has_marker(root, &self.config.marker));

        match &found {
            Some(root) => tracing::info!("Media drive found at {}", root.display()),
            None => tracing::debug!("No drive with marker '{}' found", self.config.marker),
        }
        found
    }

    fn is_still_connected(&mut self, root: &Path) -> bool {
        has_marker(root, &self.config.marker)
    }
}

/// A readable directory containing the marker entry (any case).
pub fn has_marker(root: &Path, marker: &str) -> bool {
    root.is_dir() && find_child_ignore_case(root, marker).is_some()
}

/// Mount points of removable-looking filesystems in a mount table.
pub fn parse_mounts(content: &str) -> Vec<PathBuf> {
    content
        .lines()
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            let _device = fields.next()?;
            let mount_point = unescape_mount_path(fields.next()?);
            let fs_type = fields.next()?;

            if PSEUDO_FILESYSTEMS.contains(&fs_type) || is_system_mount(&mount_point) {
                return None;
            }
            Some(PathBuf::from(mount_point))
        })
        .collect()
}

fn is_system_mount(mount_point: &str) -> bool {
    if mount_point == "/" {
        return true;
    }
    if mount_point == "/run/media" || mount_point.starts_with("/run/media/") {
        return false;
    }
    SYSTEM_MOUNT_PREFIXES
        .iter()
        .any(|prefix| mount_point == *prefix || mount_point.starts_with(&format!("{}/", prefix)))
}

/// The mount table escapes spaces and tabs as octal (`\040`).
fn unescape_mount_path(raw: &str) -> String {
    raw.replace("\\040", " ")
        .replace("\\011", "\t")
        .replace("\\012", "\n")
        .replace("\\134", "\\")
}
