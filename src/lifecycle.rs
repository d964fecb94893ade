use crate::errors::{MarketError, Result};
use crate::types::{OrderStatus, ReservationStatus};

/// pure transition decision for the order state machine
///
/// quote -> {confirmed, cancelled}; confirmed -> {in_progress, cancelled};
/// in_progress -> {completed, disputed}; disputed -> {completed, cancelled};
/// completed and cancelled are terminal.
pub fn order_transition_allowed(from: OrderStatus, to: OrderStatus) -> bool {
    use OrderStatus::*;
    matches!(
        (from, to),
        (Quote, Confirmed)
            | (Quote, Cancelled)
            | (Confirmed, InProgress)
            | (Confirmed, Cancelled)
            | (InProgress, Completed)
            | (InProgress, Disputed)
            | (Disputed, Completed)
            | (Disputed, Cancelled)
    )
}

/// pure transition decision for the reservation state machine
pub fn reservation_transition_allowed(from: ReservationStatus, to: ReservationStatus) -> bool {
    use ReservationStatus::*;
    matches!(
        (from, to),
        (Reserved, Picked)
            | (Reserved, Cancelled)
            | (Picked, Active)
            | (Picked, Cancelled)
            | (Active, Returned)
            | (Active, Disputed)
            | (Returned, Disputed)
            | (Disputed, Returned)
    )
}

/// fail with `InvalidTransition` unless the order move is in the graph
pub fn ensure_order_transition(from: OrderStatus, to: OrderStatus) -> Result<()> {
    if order_transition_allowed(from, to) {
        Ok(())
    } else {
        Err(MarketError::InvalidTransition {
            entity: "order",
            from: format!("{:?}", from),
            to: format!("{:?}", to),
        })
    }
}

/// fail with `InvalidTransition` unless the reservation move is in the graph
pub fn ensure_reservation_transition(from: ReservationStatus, to: ReservationStatus) -> Result<()> {
    if reservation_transition_allowed(from, to) {
        Ok(())
    } else {
        Err(MarketError::InvalidTransition {
            entity: "reservation",
            from: format!("{:?}", from),
            to: format!("{:?}", to),
        })
    }
}

/// the legal path from a reservation's current status to `target`, walking
/// intermediate states where the graph has no direct edge (picked ->
/// active -> returned on host return)
pub fn reservation_path(from: ReservationStatus, target: ReservationStatus) -> Result<Vec<ReservationStatus>> {
    use ReservationStatus::*;

    if from == target {
        return Ok(Vec::new());
    }
    if reservation_transition_allowed(from, target) {
        return Ok(vec![target]);
    }
    // the one multi-hop the operations need
    if from == Picked && target == Returned {
        return Ok(vec![Active, Returned]);
    }
    Err(MarketError::InvalidTransition {
        entity: "reservation",
        from: format!("{:?}", from),
        to: format!("{:?}", target),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use OrderStatus as O;
    use ReservationStatus as R;

    #[test]
    fn test_order_graph() {
        assert!(order_transition_allowed(O::Quote, O::Confirmed));
        assert!(order_transition_allowed(O::Quote, O::Cancelled));
        assert!(order_transition_allowed(O::Confirmed, O::InProgress));
        assert!(order_transition_allowed(O::InProgress, O::Disputed));
        assert!(order_transition_allowed(O::Disputed, O::Completed));
        assert!(order_transition_allowed(O::Disputed, O::Cancelled));

        // no skips, no resurrection
        assert!(!order_transition_allowed(O::Quote, O::InProgress));
        assert!(!order_transition_allowed(O::Quote, O::Completed));
        assert!(!order_transition_allowed(O::Completed, O::Cancelled));
        assert!(!order_transition_allowed(O::Cancelled, O::Quote));
        assert!(!order_transition_allowed(O::InProgress, O::Cancelled));
    }

    #[test]
    fn test_reservation_graph() {
        assert!(reservation_transition_allowed(R::Reserved, R::Picked));
        assert!(reservation_transition_allowed(R::Picked, R::Active));
        assert!(reservation_transition_allowed(R::Active, R::Returned));
        assert!(reservation_transition_allowed(R::Returned, R::Disputed));
        assert!(reservation_transition_allowed(R::Disputed, R::Returned));

        assert!(!reservation_transition_allowed(R::Reserved, R::Returned));
        assert!(!reservation_transition_allowed(R::Cancelled, R::Reserved));
        assert!(!reservation_transition_allowed(R::Active, R::Cancelled));
    }

    #[test]
    fn test_invalid_transition_names_states() {
        let err = ensure_order_transition(O::Quote, O::Completed).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("Quote"));
        assert!(message.contains("Completed"));
    }

    #[test]
    fn test_reservation_path_walks_graph() {
        assert_eq!(reservation_path(R::Picked, R::Returned).unwrap(), vec![R::Active, R::Returned]);
        assert_eq!(reservation_path(R::Active, R::Returned).unwrap(), vec![R::Returned]);
        assert!(reservation_path(R::Returned, R::Returned).unwrap().is_empty());
        assert!(reservation_path(R::Cancelled, R::Returned).is_err());
    }
}
