//! Coarse progress reporting for snapshot construction.
//!
//! The pipeline publishes a [`Progress`] value at the start of every stage.
//! Observers (a CLI spinner, a log line, a UI bar) hold the receiving end of
//! [`progress_channel`]. Sending never blocks and never fails the build: a
//! missing observer or a dropped receiver is ignored.

use std::fmt;
use std::sync::mpsc;

/// Pipeline stage, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage
{
    Started,
    NativeTypes,
    NativeObjects,
    NativeAllocations,
    RootReferences,
    MemoryRegions,
    ManagedTypes,
    FieldDescriptions,
    FieldTypes,
    HeapSegments,
    StackSegments,
    SegmentStore,
    GcHandles,
    Crawl,
    AddressMap,
    Complete,
}

impl Stage
{
    /// Completion percentage reported when the stage begins.
    #[must_use]
    pub const fn percent(self) -> u8
    {
        match self {
            Stage::Started => 0,
            Stage::NativeTypes => 8,
            Stage::NativeObjects => 12,
            Stage::NativeAllocations => 16,
            Stage::RootReferences => 20,
            Stage::MemoryRegions => 24,
            Stage::ManagedTypes => 28,
            Stage::FieldDescriptions => 32,
            Stage::FieldTypes => 36,
            Stage::HeapSegments => 40,
            Stage::StackSegments => 44,
            Stage::SegmentStore => 48,
            Stage::GcHandles => 52,
            Stage::Crawl => 65,
            Stage::AddressMap => 95,
            Stage::Complete => 100,
        }
    }

    /// Human-readable description of the stage.
    #[must_use]
    pub const fn describe(self) -> &'static str
    {
        match self {
            Stage::Started => "starting",
            Stage::NativeTypes => "reading native types",
            Stage::NativeObjects => "reading native objects",
            Stage::NativeAllocations => "reading native allocations",
            Stage::RootReferences => "reading root references",
            Stage::MemoryRegions => "reading memory regions",
            Stage::ManagedTypes => "reading managed types",
            Stage::FieldDescriptions => "reading field descriptions",
            Stage::FieldTypes => "resolving field types",
            Stage::HeapSegments => "reading heap sections",
            Stage::StackSegments => "reading stack sections",
            Stage::SegmentStore => "sorting managed memory",
            Stage::GcHandles => "reading GC handles",
            Stage::Crawl => "crawling managed objects",
            Stage::AddressMap => "building address map",
            Stage::Complete => "done",
        }
    }
}

/// One progress notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress
{
    pub stage: Stage,
    pub percent: u8,
}

impl From<Stage> for Progress
{
    fn from(stage: Stage) -> Self
    {
        Self {
            stage,
            percent: stage.percent(),
        }
    }
}

impl fmt::Display for Progress
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "{:>3}% {}", self.percent, self.stage.describe())
    }
}

/// Sender side of the progress channel.
pub type ProgressSender = mpsc::Sender<Progress>;
/// Receiver side of the progress channel.
pub type ProgressReceiver = mpsc::Receiver<Progress>;

/// Create a new progress channel.
#[must_use]
pub fn progress_channel() -> (ProgressSender, ProgressReceiver)
{
    mpsc::channel()
}

/// Publish `stage` to the observer, if there is one still listening.
pub fn report(observer: Option<&ProgressSender>, stage: Stage)
{
    if let Some(sender) = observer {
        // A closed receiver only means nobody is watching anymore.
        let _ = sender.send(Progress::from(stage));
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_percent_increases_with_stage()
    {
        let stages = [
            Stage::Started,
            Stage::NativeTypes,
            Stage::NativeObjects,
            Stage::NativeAllocations,
            Stage::RootReferences,
            Stage::MemoryRegions,
            Stage::ManagedTypes,
            Stage::FieldDescriptions,
            Stage::FieldTypes,
            Stage::HeapSegments,
            Stage::StackSegments,
            Stage::SegmentStore,
            Stage::GcHandles,
            Stage::Crawl,
            Stage::AddressMap,
            Stage::Complete,
        ];
        for pair in stages.windows(2) {
            assert!(pair[0].percent() < pair[1].percent(), "{:?} >= {:?}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_report_without_observer()
    {
        report(None, Stage::Crawl);
    }

    #[test]
    fn test_report_to_dropped_receiver()
    {
        let (sender, receiver) = progress_channel();
        drop(receiver);
        report(Some(&sender), Stage::Complete);
    }

    #[test]
    fn test_progress_display()
    {
        assert_eq!(Progress::from(Stage::Crawl).to_string(), " 65% crawling managed objects");
    }
}
