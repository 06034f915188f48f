//! Startup media: picks how to hand a path to the machine from its extension.

use std::path::Path;

use a8remote_core::core::machine::Machine;
use a8remote_core::error::MachineError;

/// How a startup file is attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    /// `.atr` / `.xfd`, mounted in drive 1.
    Disk,
    /// `.a8s`, restored as a saved state.
    State,
    /// Anything else is treated as a binary load file.
    Program,
}

impl MediaKind {
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("atr" | "xfd") => MediaKind::Disk,
            Some("a8s") => MediaKind::State,
            _ => MediaKind::Program,
        }
    }
}

/// Attach `path` to the machine according to its [`MediaKind`].
pub fn load(machine: &mut dyn Machine, path: &Path) -> Result<MediaKind, MachineError> {
    let kind = MediaKind::from_path(path);
    match kind {
        MediaKind::Disk => machine.insert_disk(1, path)?,
        MediaKind::State => machine.load_state(path)?,
        MediaKind::Program => machine.load_program(path)?,
    }
    log::info!("Loaded {:?} from {}", kind, path.display());
    Ok(kind)
}

#[cfg(test)]
mod tests {
    use super::*;
    use a8remote_machines::HeadlessMachine;

    #[test]
    fn kind_follows_extension() {
        assert_eq!(MediaKind::from_path(Path::new("dos.ATR")), MediaKind::Disk);
        assert_eq!(MediaKind::from_path(Path::new("raw.xfd")), MediaKind::Disk);
        assert_eq!(MediaKind::from_path(Path::new("save.a8s")), MediaKind::State);
        assert_eq!(MediaKind::from_path(Path::new("game.xex")), MediaKind::Program);
        assert_eq!(MediaKind::from_path(Path::new("noext")), MediaKind::Program);
    }

    #[test]
    fn program_is_loaded_and_run_address_applied() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("loop.xex");
        // JMP $2000 at $2000, RUNAD = $2000
        let bytes = [
            0xFF, 0xFF, 0x00, 0x20, 0x02, 0x20, 0x4C, 0x00, 0x20, 0xE0, 0x02, 0xE1, 0x02, 0x00,
            0x20,
        ];
        std::fs::write(&path, bytes).unwrap();

        let mut machine = HeadlessMachine::new();
        assert_eq!(load(&mut machine, &path).unwrap(), MediaKind::Program);
        assert_eq!(machine.cpu().pc, 0x2000);
    }

    #[test]
    fn disk_goes_to_drive_one() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blank.xfd");
        std::fs::write(&path, vec![0u8; 720 * 128]).unwrap();

        let mut machine = HeadlessMachine::new();
        assert_eq!(load(&mut machine, &path).unwrap(), MediaKind::Disk);
        let status = machine.disk_status();
        assert_eq!(status.len(), 1);
        assert_eq!(status[0].drive, 1);
    }

    #[test]
    fn state_round_trips_through_loader() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snap.a8s");
        let mut machine = HeadlessMachine::new();
        machine.poke(0x0600, 0x5A);
        machine.save_state(&path).unwrap();

        let mut fresh = HeadlessMachine::new();
        assert_eq!(load(&mut fresh, &path).unwrap(), MediaKind::State);
        assert_eq!(fresh.peek(0x0600), 0x5A);
    }

    #[test]
    fn missing_file_is_reported() {
        let mut machine = HeadlessMachine::new();
        assert!(load(&mut machine, Path::new("/nonexistent/a8remote.xex")).is_err());
    }
}
