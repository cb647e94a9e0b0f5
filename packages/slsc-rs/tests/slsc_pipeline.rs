use slsc_rs::dataset::RawDataset;
use slsc_rs::geometry::linear_array;
use slsc_rs::{
    rx_delay, ChannelTensor, CubicResampler, DelayModel, FullRx, InterRfDataset, InterRfParams,
    PlaneWaveTx, Point3, RunConfig, SlscConfig, SlscProcessor,
};

const C: f64 = 1540.0;
const PITCH: f64 = 0.3e-3;
const FC: f64 = 5e6;
const DT: f64 = 10e-9;
const NT: usize = 2048;

/// Gaussian-windowed tone burst centered on zero
fn pulse(t: f64) -> f64 {
    let sigma = 1.0 / FC;
    (2.0 * std::f64::consts::PI * FC * t).cos() * (-(t * t) / (2.0 * sigma * sigma)).exp()
}

/// Echo of a single scatterer at `target`, one row per element
fn point_echo(elements: &[Point3], tx: &PlaneWaveTx, target: &Point3) -> Vec<f64> {
    let tau_tx = tx.events()[0].delay_to(target);
    let mut data = Vec::with_capacity(elements.len() * NT);
    for e in elements {
        let tau = tau_tx + rx_delay(e, target, C).unwrap();
        data.extend((0..NT).map(|i| pulse(i as f64 * DT - tau)));
    }
    data
}

#[test]
fn test_symmetric_array_gives_mirrored_rx_delays() {
    let elements = linear_array(8, PITCH);
    let mut rx = FullRx::new(elements, C).unwrap();
    rx.gentabs(&[0.0, 0.0, 10e-3], &[1, 3]).unwrap();
    let column = rx.tables().unwrap().column(0);
    for i in 0..4 {
        let (a, b) = (column[i], column[7 - i]);
        assert!((a - b).abs() < 1e-15, "element {} vs {}: {} != {}", i, 7 - i, a, b);
    }
    // delays grow away from the center
    assert!(column[0] > column[1] && column[1] > column[2] && column[2] > column[3]);
}

#[test]
fn test_point_scatterer_is_fully_coherent_at_lag_one() {
    let elements = linear_array(8, PITCH);
    let target = Point3::new(0.0, 0.0, 10e-3);
    let tx = PlaneWaveTx::from_linear_array(&[0.0], &elements, C).unwrap();
    let data = point_echo(&elements, &tx, &target);
    let tensor = ChannelTensor::new(data, &[1, 8, NT], 0.0, DT).unwrap();

    let rx = FullRx::new(elements, C).unwrap();
    let options = SlscConfig {
        lags: vec![1],
        window_samples: 9,
        ..SlscConfig::default()
    };
    let processor = SlscProcessor::from_points(Box::new(tx), rx, &[target], options).unwrap();
    let image = processor
        .process(&tensor, &CubicResampler::default(), None)
        .unwrap();

    let value = image.values[0].unwrap();
    assert!((value - 1.0).abs() < 1e-5, "SLSC at lag 1 was {}", value);
    assert!(image.masked.is_empty());
}

#[test]
fn test_raw_dataset_through_processor() {
    let nele = 8;
    let elements = linear_array(nele, PITCH);
    let alphas = [-0.05, 0.0, 0.05];
    let target = Point3::new(0.5e-3, 0.0, 12e-3);
    let tx = PlaneWaveTx::from_linear_array(&alphas, &elements, C).unwrap();

    let mut raw: Vec<i16> = Vec::with_capacity(alphas.len() * nele * NT);
    for event in tx.events() {
        let tau_tx = event.delay_to(&target);
        for e in &elements {
            let tau = tau_tx + rx_delay(e, &target, C).unwrap();
            raw.extend((0..NT).map(|i| (10_000.0 * pulse(i as f64 * DT - tau)).round() as i16));
        }
    }

    let mut dataset = InterRfDataset::new(InterRfParams {
        nrot: 1,
        nang: alphas.len(),
        nele,
        nsamp: NT,
        dphi: 0.0,
        dalpha: 0.05,
        ts: DT,
        tstart: 0.0,
        alpha0: None,
        phi0: None,
    })
    .unwrap();
    dataset.transform(&raw).unwrap();
    let angles = dataset.steering_angles();
    assert!((angles[0] + 0.05).abs() < 1e-12 && (angles[2] - 0.05).abs() < 1e-12);

    let tensor = dataset.channel_tensor(0).unwrap();
    let rx = FullRx::new(elements, C).unwrap();
    let options = SlscConfig {
        lags: vec![1, 2],
        ..SlscConfig::default()
    };
    let processor = SlscProcessor::from_points(Box::new(tx), rx, &[target], options).unwrap();
    let result = processor
        .process(&tensor, &CubicResampler::default(), None)
        .unwrap()
        .get(0)
        .unwrap();

    assert_eq!(result.curve.len(), 3);
    assert!((result.curve[1] - 1.0).abs() < 1e-4);
    assert!((result.value - 2.0).abs() < 1e-3);
}

#[test]
fn test_processor_from_config() {
    let config = RunConfig::from_json(
        r#"{
            "probe": { "noElements": 16, "pitch": 0.0003 },
            "acquisition": { "nang": 3, "nsamp": 2048, "fc": 5000000.0, "fs": 100000000.0,
                             "tstart": 0.0, "dalpha": 0.05 },
            "field": { "x_min": -0.001, "x_max": 0.001, "nx": 5, "z_min": 0.01, "z_max": 0.011, "dz": 0.0005 },
            "slsc": { "lags": [1, 2, 3], "fnum": 1.5, "degenerate": "mask" }
        }"#,
    )
    .unwrap();
    let processor = SlscProcessor::from_config(&config).unwrap();
    assert_eq!(processor.point_count(), 10);
    assert_eq!(processor.tx_tables().unwrap().channels(), 3);
    assert_eq!(processor.rx_tables().unwrap().channels(), 16);
    assert_eq!(processor.options().window_samples, 9);
}
