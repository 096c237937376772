//! Task priorities and worker eligibility bitmasks.

/// Priority of a task, ordered from highest to lowest for dispatch.
///
/// `Inherit` defers to the enclosing group; the scheduler resolves it by
/// walking the parent chain at enqueue time, defaulting to [`Normal`]
/// (see `Scheduler::add`).
///
/// [`Normal`]: TaskPriority::Normal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TaskPriority {
    /// Serviced before everything else.
    High,
    /// Between `High` and `Normal`.
    AboveNormal,
    /// The default priority.
    #[default]
    Normal,
    /// Between `Normal` and `Low`.
    BelowNormal,
    /// Serviced only when all other queues are empty.
    Low,
    /// Resolve from the parent group at enqueue time.
    Inherit,
}

impl TaskPriority {
    /// Number of concrete priority levels (`Inherit` excluded).
    pub const COUNT: usize = 5;

    /// Concrete levels in dispatch order, highest first.
    pub const DISPATCH_ORDER: [Self; Self::COUNT] = [
        Self::High,
        Self::AboveNormal,
        Self::Normal,
        Self::BelowNormal,
        Self::Low,
    ];

    /// Queue slot for this priority.
    ///
    /// # Panics
    ///
    /// Panics on [`Inherit`](Self::Inherit), which must be resolved before
    /// any queue operation.
    #[must_use]
    pub fn queue_index(self) -> usize {
        match self {
            Self::High => 0,
            Self::AboveNormal => 1,
            Self::Normal => 2,
            Self::BelowNormal => 3,
            Self::Low => 4,
            Self::Inherit => panic!("inherit priority must be resolved before dispatch"),
        }
    }

    /// Returns `true` for a concrete (non-`Inherit`) priority.
    #[must_use]
    pub fn is_concrete(self) -> bool {
        self != Self::Inherit
    }
}

/// The set of task priorities a worker is willing to execute.
///
/// Bit `n` corresponds to the concrete priority with queue index `n`, so the
/// eligibility test is `(1 << index) & mask != 0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerPriority(u8);

impl WorkerPriority {
    /// Every priority level.
    pub const ANY: Self = Self(0b1_1111);
    /// The three middle levels: `AboveNormal`, `Normal`, `BelowNormal`.
    pub const ANY_NORMAL: Self = Self(0b0_1110);
    /// `Normal`, `BelowNormal` and `Low`.
    pub const NORMAL_OR_LOW: Self = Self(0b1_1100);
    /// `High`, `AboveNormal` and `Normal`.
    pub const NORMAL_OR_HIGH: Self = Self(0b0_0111);

    /// Builds a mask from explicit levels.
    ///
    /// # Panics
    ///
    /// Panics if a level is [`TaskPriority::Inherit`].
    #[must_use]
    pub fn from_levels(levels: &[TaskPriority]) -> Self {
        let mut mask = 0u8;
        for level in levels {
            mask |= 1 << level.queue_index();
        }
        Self(mask)
    }

    /// Returns `true` if workers with this mask may execute `priority`.
    #[must_use]
    pub fn can_work_on(self, priority: TaskPriority) -> bool {
        (1 << priority.queue_index()) & self.0 != 0
    }

    /// Iterates the concrete levels covered by this mask, highest first.
    pub fn levels(self) -> impl Iterator<Item = TaskPriority> {
        TaskPriority::DISPATCH_ORDER
            .into_iter()
            .filter(move |level| self.can_work_on(*level))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatch_order_is_highest_first() {
        assert_eq!(TaskPriority::DISPATCH_ORDER[0], TaskPriority::High);
        assert_eq!(
            TaskPriority::DISPATCH_ORDER[TaskPriority::COUNT - 1],
            TaskPriority::Low
        );
        for (index, level) in TaskPriority::DISPATCH_ORDER.into_iter().enumerate() {
            assert_eq!(level.queue_index(), index);
        }
    }

    #[test]
    #[should_panic(expected = "inherit priority")]
    fn inherit_has_no_queue_index() {
        let _ = TaskPriority::Inherit.queue_index();
    }

    #[test]
    fn any_mask_covers_every_level() {
        for level in TaskPriority::DISPATCH_ORDER {
            assert!(WorkerPriority::ANY.can_work_on(level));
        }
    }

    #[test]
    fn alias_masks_cover_documented_levels() {
        let cases = [
            (
                WorkerPriority::ANY_NORMAL,
                vec![
                    TaskPriority::AboveNormal,
                    TaskPriority::Normal,
                    TaskPriority::BelowNormal,
                ],
            ),
            (
                WorkerPriority::NORMAL_OR_LOW,
                vec![TaskPriority::Normal, TaskPriority::BelowNormal, TaskPriority::Low],
            ),
            (
                WorkerPriority::NORMAL_OR_HIGH,
                vec![TaskPriority::High, TaskPriority::AboveNormal, TaskPriority::Normal],
            ),
        ];
        for (mask, expected) in cases {
            let covered: Vec<_> = mask.levels().collect();
            assert_eq!(covered, expected);
        }
    }

    #[test]
    fn from_levels_round_trips() {
        let mask = WorkerPriority::from_levels(&[TaskPriority::High, TaskPriority::Low]);
        assert!(mask.can_work_on(TaskPriority::High));
        assert!(mask.can_work_on(TaskPriority::Low));
        assert!(!mask.can_work_on(TaskPriority::Normal));
    }
}
