//! 控制接口测试：采样率、队列深度、距离阈值

use ll905_driver::*;
use ll905_i2c::SimulatedLidar;
use std::sync::Arc;
use std::time::Duration;

fn setup() -> (SimulatedLidar, Arc<ManualScheduler>, Ll905) {
    let sim = SimulatedLidar::new(0x62, 250);
    let scheduler = Arc::new(ManualScheduler::new());
    let lidar = Ll905Builder::new()
        .transport(Box::new(sim.clone()))
        .scheduler(scheduler.clone())
        .build()
        .unwrap();
    (sim, scheduler, lidar)
}

#[test]
fn test_rate_requests() {
    let (_sim, _scheduler, lidar) = setup();

    lidar.set_rate(PollRate::Hz(10)).unwrap();
    assert_eq!(lidar.measure_interval(), Duration::from_millis(100));
    assert_eq!(lidar.get_rate(), PollRate::Hz(10));

    lidar.set_rate(PollRate::Hz(1)).unwrap();
    assert_eq!(lidar.measure_interval(), Duration::from_secs(1));

    lidar.set_rate(PollRate::Default).unwrap();
    assert_eq!(lidar.get_rate(), PollRate::Hz(PollRate::MAX_HZ));

    lidar.set_rate(PollRate::Manual).unwrap();
    assert_eq!(lidar.measure_interval(), Duration::ZERO);
}

#[test]
fn test_invalid_rate_leaves_state_unchanged() {
    let (_sim, scheduler, lidar) = setup();
    lidar.set_rate(PollRate::Hz(2)).unwrap();
    let scheduled = scheduler.schedule_count();

    for rate in [PollRate::External, PollRate::Hz(0), PollRate::Hz(11)] {
        assert!(matches!(
            lidar.set_rate(rate),
            Err(DriverError::InvalidArgument(_))
        ));
    }

    assert_eq!(lidar.get_rate(), PollRate::Hz(2));
    assert_eq!(lidar.acquisition_state(), AcquisitionState::Starting);
    assert_eq!(scheduler.schedule_count(), scheduled);
}

#[test]
fn test_invalid_rate_from_manual_does_not_start() {
    let (_sim, scheduler, lidar) = setup();

    assert!(lidar.set_rate(PollRate::Hz(50)).is_err());
    assert_eq!(lidar.get_rate(), PollRate::Manual);
    assert!(!scheduler.has_pending());
}

#[test]
fn test_queue_depth() {
    let (_sim, _scheduler, lidar) = setup();

    lidar.set_queue_depth(10).unwrap();
    assert_eq!(lidar.get_queue_depth(), 10);

    for depth in [0, 101] {
        match lidar.set_queue_depth(depth) {
            Err(DriverError::Buffer(BufferError::InvalidCapacity { requested })) => {
                assert_eq!(requested, depth)
            },
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(lidar.get_queue_depth(), 10);
    }

    lidar.set_queue_depth(1).unwrap();
    lidar.set_queue_depth(100).unwrap();
    assert_eq!(lidar.get_queue_depth(), 100);
}

#[test]
fn test_shrinking_queue_keeps_newest_reports() {
    let (sim, scheduler, lidar) = setup();
    lidar.set_queue_depth(5).unwrap();
    sim.push_distances_cm([110, 120, 130, 140, 150]);
    lidar.set_rate(PollRate::Default).unwrap();

    for _ in 0..6 {
        scheduler.fire();
    }
    assert_eq!(lidar.queued_reports(), 5);

    lidar.set_queue_depth(2).unwrap();
    assert_eq!(lidar.queued_reports(), 2);

    let cm: Vec<u32> = lidar
        .read(5)
        .unwrap()
        .iter()
        .map(|r| (r.distance * 100.0).round() as u32)
        .collect();
    assert_eq!(cm, vec![140, 150]);
}

#[test]
fn test_distance_thresholds() {
    let (_sim, _scheduler, lidar) = setup();
    assert_eq!(lidar.min_distance(), 0.20);
    assert_eq!(lidar.max_distance(), 10.0);

    lidar.set_min_distance(0.5).unwrap();
    lidar.set_max_distance(6.0).unwrap();
    assert_eq!(lidar.min_distance(), 0.5);
    assert_eq!(lidar.max_distance(), 6.0);

    for bad in [-1.0, f32::NAN, f32::INFINITY] {
        assert!(matches!(
            lidar.set_min_distance(bad),
            Err(DriverError::InvalidArgument(_))
        ));
        assert!(lidar.set_max_distance(bad).is_err());
    }
    assert_eq!(lidar.min_distance(), 0.5);
    assert_eq!(lidar.max_distance(), 6.0);
}

#[test]
fn test_periodic_read_when_empty() {
    let (_sim, _scheduler, lidar) = setup();
    lidar.set_rate(PollRate::Default).unwrap();

    assert!(matches!(lidar.read(1), Err(DriverError::NoData)));
    assert!(!lidar.wait_for_report(Duration::from_millis(5)));
    assert_eq!(lidar.latest_report(), None);
}
