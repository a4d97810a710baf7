//! The eight-piston view of a device.

use pistonhub_core::{DeviceId, PistonNumber};
use pistonhub_store::Store;

use crate::error::Result;
use crate::types::PistonView;

/// All eight pistons of a device, ordered by number.
///
/// Pistons that were never commanded have no row and are reported as
/// `Inactive` with no `last_triggered`. Ownership is not checked here.
///
/// # Errors
///
/// Returns an error if the store fails.
pub fn piston_view<S: Store + ?Sized>(store: &S, device_id: &DeviceId) -> Result<Vec<PistonView>> {
    let mut rows = store.list_pistons(device_id)?.into_iter().peekable();

    let mut view = Vec::with_capacity(usize::from(pistonhub_core::PISTON_COUNT));
    for number in PistonNumber::all() {
        match rows.next_if(|row| row.piston_number == number) {
            Some(row) => view.push(PistonView::from(row)),
            None => view.push(PistonView::never_triggered(number)),
        }
    }
    Ok(view)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{register_device, setup_store};
    use chrono::Utc;
    use pistonhub_core::{PistonId, PistonState, UserId};
    use pistonhub_store::Piston;

    fn put(store: &impl Store, device_id: &DeviceId, n: i64, state: PistonState) -> Piston {
        let piston = Piston {
            piston_id: PistonId::generate(),
            device_id: *device_id,
            piston_number: PistonNumber::new(n).unwrap(),
            state,
            last_triggered: Some(Utc::now()),
        };
        store.put_piston(&piston).unwrap();
        piston
    }

    #[test]
    fn no_rows_yields_eight_defaults() {
        let (store, _dir) = setup_store();
        let device = register_device(&store, &UserId::from_bytes([1u8; 32]), "valves");

        let view = piston_view(&*store, &device.device_id).unwrap();

        assert_eq!(view.len(), 8);
        for (i, entry) in view.iter().enumerate() {
            assert_eq!(usize::from(entry.piston_number.get()), i + 1);
            assert_eq!(entry.state, PistonState::Inactive);
            assert!(entry.last_triggered.is_none());
        }
    }

    #[test]
    fn rows_fill_their_slots() {
        let (store, _dir) = setup_store();
        let device = register_device(&store, &UserId::from_bytes([1u8; 32]), "valves");
        let three = put(&*store, &device.device_id, 3, PistonState::Active);
        let eight = put(&*store, &device.device_id, 8, PistonState::Inactive);

        let view = piston_view(&*store, &device.device_id).unwrap();

        assert_eq!(view.len(), 8);
        assert_eq!(view[2].piston_id, Some(three.piston_id));
        assert_eq!(view[2].state, PistonState::Active);
        assert_eq!(view[7].piston_id, Some(eight.piston_id));
        assert!(view[7].last_triggered.is_some());
        assert!(view[0].piston_id.is_none());
        assert!(view[6].piston_id.is_none());
    }

    #[test]
    fn full_device_uses_every_row() {
        let (store, _dir) = setup_store();
        let device = register_device(&store, &UserId::from_bytes([1u8; 32]), "valves");
        for n in 1..=8 {
            put(&*store, &device.device_id, n, PistonState::Active);
        }

        let view = piston_view(&*store, &device.device_id).unwrap();
        assert!(view.iter().all(|p| p.state == PistonState::Active && p.piston_id.is_some()));
    }
}
