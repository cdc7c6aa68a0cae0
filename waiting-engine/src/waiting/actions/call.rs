//! Call: WAITING → CALLED, starts the call timer

use shared::models::{WaitingEntry, WaitingStatus};

use super::{ActionContext, TransitionAction};
use crate::waiting::error::Rejection;
use crate::waiting::machine::Operation;

#[derive(Debug, Clone, Default)]
pub struct CallAction;

impl TransitionAction for CallAction {
    const OPERATION: Operation = Operation::Call;

    fn apply(&self, entry: &mut WaitingEntry, ctx: &ActionContext<'_>) -> Result<(), Rejection> {
        entry.status = WaitingStatus::Called;
        entry.called_at = Some(ctx.now);
        entry.called_count = 1;
        entry.call_expire_at = Some(ctx.now + ctx.setting.call_timeout_millis());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::waiting::actions::run;
    use crate::waiting::actions::test_support::{NOW, called, entry};
    use crate::waiting::error::RejectReason;
    use shared::models::WaitingSetting;

    #[test]
    fn test_call_sets_timer() {
        let mut setting = WaitingSetting::new(1);
        setting.call_timeout_minutes = 5;
        let ctx = ActionContext { now: NOW, setting: &setting };

        let next = run(&CallAction, &entry(WaitingStatus::Waiting), &ctx).unwrap();
        assert_eq!(next.status, WaitingStatus::Called);
        assert_eq!(next.called_at, Some(NOW));
        assert_eq!(next.called_count, 1);
        assert_eq!(next.call_expire_at, Some(NOW + 5 * 60_000));
        assert_eq!(next.waiting_number, 3);
    }

    #[test]
    fn test_call_rejected_unless_waiting() {
        let setting = WaitingSetting::new(1);
        let ctx = ActionContext { now: NOW, setting: &setting };

        for e in [
            called(1),
            entry(WaitingStatus::Seated),
            entry(WaitingStatus::Cancelled),
            entry(WaitingStatus::NoShow),
        ] {
            let err = run(&CallAction, &e, &ctx).unwrap_err();
            assert_eq!(err.reason, RejectReason::InvalidStatus);
        }
    }
}
