use super::ProgressCallback;

/// Named pipeline stages reported by ASR providers.
///
/// Each stage carries a fixed default progress/message pair. Providers emit
/// stages through an optional progress callback; a missing callback makes
/// reporting a no-op without changing behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AsrStage {
    Uploading,
    Submitting,
    QueryingResult,
    CreatingTask,
    Transcribing,
    Completed,
}

impl AsrStage {
    /// Default progress percentage for this stage
    pub fn progress(self) -> u8 {
        match self {
            AsrStage::Uploading => 20,
            AsrStage::Submitting => 40,
            AsrStage::QueryingResult => 60,
            AsrStage::CreatingTask => 40,
            AsrStage::Transcribing => 60,
            AsrStage::Completed => 100,
        }
    }

    /// Default human-readable message for this stage
    pub fn message(self) -> &'static str {
        match self {
            AsrStage::Uploading => "uploading",
            AsrStage::Submitting => "submitting",
            AsrStage::QueryingResult => "querying result",
            AsrStage::CreatingTask => "creating task",
            AsrStage::Transcribing => "transcribing",
            AsrStage::Completed => "completed",
        }
    }

    /// Emit this stage with its default progress
    pub fn emit(self, callback: Option<&ProgressCallback>) {
        if let Some(cb) = callback {
            cb(self.progress(), self.message());
        }
    }

    /// Emit this stage with an overridden progress value, keeping the
    /// default message. Used when a provider interpolates progress during a
    /// long poll.
    pub fn emit_with_progress(self, callback: Option<&ProgressCallback>, progress: u8) {
        if let Some(cb) = callback {
            cb(progress, self.message());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn recording_callback() -> (ProgressCallback, Arc<Mutex<Vec<(u8, String)>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let cb: ProgressCallback = Box::new(move |progress, message| {
            sink.lock().unwrap().push((progress, message.to_string()));
        });
        (cb, seen)
    }

    #[test]
    fn test_completed_is_always_100() {
        assert_eq!(AsrStage::Completed.progress(), 100);
    }

    #[test]
    fn test_default_pairs() {
        assert_eq!(AsrStage::Uploading.progress(), 20);
        assert_eq!(AsrStage::Submitting.progress(), 40);
        assert_eq!(AsrStage::CreatingTask.progress(), 40);
        assert_eq!(AsrStage::QueryingResult.progress(), 60);
        assert_eq!(AsrStage::Transcribing.progress(), 60);
        assert_eq!(AsrStage::QueryingResult.message(), "querying result");
    }

    #[test]
    fn test_emit_uses_default_pair() {
        let (cb, seen) = recording_callback();
        AsrStage::Uploading.emit(Some(&cb));
        assert_eq!(*seen.lock().unwrap(), vec![(20, "uploading".to_string())]);
    }

    #[test]
    fn test_override_keeps_default_message() {
        let (cb, seen) = recording_callback();
        AsrStage::Transcribing.emit_with_progress(Some(&cb), 87);
        assert_eq!(
            *seen.lock().unwrap(),
            vec![(87, "transcribing".to_string())]
        );
    }

    #[test]
    fn test_absent_callback_is_a_noop() {
        AsrStage::Completed.emit(None);
        AsrStage::Transcribing.emit_with_progress(None, 75);
    }
}
