use std::time::Duration;

/// A structure to manage the flashing procedure progress reporting.
///
/// This struct stores a handler closure which will be called everytime an event happens during erasing or programming.
///
/// # Example
///
/// ```
/// use nvmflash::flashing::FlashProgress;
///
/// // Print events
/// let progress = FlashProgress::new(|event| println!("Event: {:#?}", event));
/// ```
pub struct FlashProgress {
    handler: Box<dyn Fn(ProgressEvent)>,
}

impl FlashProgress {
    /// Create a new `FlashProgress` structure with a given `handler` to be called on events.
    pub fn new(handler: impl Fn(ProgressEvent) + 'static) -> Self {
        Self {
            handler: Box::new(handler),
        }
    }

    fn emit(&self, event: ProgressEvent) {
        (self.handler)(event);
    }

    pub(super) fn started_erasing(&self, pages: usize) {
        self.emit(ProgressEvent::StartedErasing { pages });
    }

    pub(super) fn sector_erased(&self, address: u64, size: u32, time: Duration) {
        self.emit(ProgressEvent::SectorErased {
            address,
            size,
            time,
        });
    }

    pub(super) fn failed_erasing(&self) {
        self.emit(ProgressEvent::FailedErasing);
    }

    pub(super) fn finished_erasing(&self) {
        self.emit(ProgressEvent::FinishedErasing);
    }

    pub(super) fn started_programming(&self, length: usize) {
        self.emit(ProgressEvent::StartedProgramming { length });
    }

    pub(super) fn data_programmed(&self, address: u64, size: usize, time: Duration) {
        self.emit(ProgressEvent::DataProgrammed {
            address,
            size,
            time,
        });
    }

    pub(super) fn failed_programming(&self) {
        self.emit(ProgressEvent::FailedProgramming);
    }

    pub(super) fn finished_programming(&self) {
        self.emit(ProgressEvent::FinishedProgramming);
    }
}

/// Possible events during erasing and programming.
///
/// If an erase works without problems, the events will arrive in the
/// following order:
///
/// * `StartedErasing`
/// * `SectorErased` for every page
/// * `FinishedErasing`
///
/// Programming reports `StartedProgramming`, one `DataProgrammed` and
/// `FinishedProgramming`.
///
/// If an error occurs, one of the `Failed*` events will be emitted,
/// and no further events of that operation will follow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    /// Erasing of flash has started.
    StartedErasing {
        /// Number of pages which will be erased.
        pages: usize,
    },
    /// A page has been erased successfully.
    SectorErased {
        /// Base address of the page.
        address: u64,
        /// The size of the page in bytes.
        size: u32,
        /// The time it took to erase this page.
        time: Duration,
    },
    /// Erasing of the flash has failed.
    FailedErasing,
    /// Erasing of the flash has finished successfully.
    FinishedErasing,
    /// Programming of the flash has started.
    StartedProgramming {
        /// Number of bytes which will be programmed.
        length: usize,
    },
    /// Data has been programmed successfully.
    DataProgrammed {
        /// Address of the first programmed byte.
        address: u64,
        /// Number of programmed bytes.
        size: usize,
        /// The time it took to program the data.
        time: Duration,
    },
    /// Programming of the flash failed.
    FailedProgramming,
    /// Programming of the flash has finished successfully.
    FinishedProgramming,
}
