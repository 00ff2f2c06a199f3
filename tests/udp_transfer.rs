use std::thread;

use stopwait::channel::{Channel, DropPolicy, Lossy, UdpChannel};

fn payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 13 % 256) as u8).collect()
}

#[test]
fn udp_round_trip_with_defaults() {
    let mut rx = UdpChannel::bind("127.0.0.1:0").expect("bind receiver");
    let rx_addr = rx.local_addr().expect("receiver addr");

    let handle = thread::spawn(move || {
        let mut output = Vec::new();
        let bytes = stopwait::recv(&mut rx, &mut output);
        (bytes, output)
    });

    let data = payload(10_000);
    let mut tx = UdpChannel::bind("127.0.0.1:0").expect("bind sender");
    tx.connect(rx_addr).expect("resolve receiver");
    let stat = stopwait::send(&mut tx, &data).expect("send");
    tx.send(&[]).expect("send close marker");

    let (bytes, output) = handle.join().expect("receiver thread");
    assert_eq!(bytes, data.len());
    assert_eq!(output, data);
    assert_eq!(stat.pushes as usize, data.len().div_ceil(1296));
}

#[test]
fn udp_round_trip_with_ack_loss() {
    let rx = UdpChannel::bind("127.0.0.1:0").expect("bind receiver");
    let rx_addr = rx.local_addr().expect("receiver addr");
    let mut rx = Lossy::new(rx, DropPolicy::EveryKth(2));

    let handle = thread::spawn(move || {
        let mut output = Vec::new();
        let bytes = stopwait::recv(&mut rx, &mut output);
        (bytes, output)
    });

    let data = payload(6_000);
    let mut tx = UdpChannel::bind("127.0.0.1:0").expect("bind sender");
    tx.connect(rx_addr).expect("resolve receiver");
    let stat = stopwait::send(&mut tx, &data).expect("send");
    tx.send(&[]).expect("send close marker");

    let (bytes, output) = handle.join().expect("receiver thread");
    assert_eq!(output, data);
    assert_eq!(bytes, data.len());
    assert!(stat.retransmissions >= 1);
}
