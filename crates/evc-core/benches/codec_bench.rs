//! Criterion benchmarks for the event client codec.
//!
//! Measures payload construction and datagram framing for the packets a
//! remote sends at key-repeat rate (BUTTON, MOUSE) and for a fragmented
//! NOTIFICATION carrying an icon.
//!
//! Run with:
//! ```bash
//! cargo bench --package evc-core --bench codec_bench
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use evc_core::{
    encode_datagrams, ButtonPacket, ClientToken, Icon, IconType, MousePacket, NotificationPacket,
    OverflowPolicy, Packet,
};

// ── Packet fixtures ───────────────────────────────────────────────────────────

fn make_button() -> Packet {
    Packet::Button(ButtonPacket::named("KB", "enter").with_repeat(false))
}

fn make_mouse() -> Packet {
    Packet::Mouse(MousePacket { x: 32_000, y: 18_000 })
}

fn make_notification(icon_len: usize) -> Packet {
    Packet::Notification(NotificationPacket {
        title: "Now Playing".to_string(),
        message: "Some Artist - Some Track".to_string(),
        icon: Some(Icon::new(IconType::Png, vec![0x89; icon_len])),
    })
}

// ── Benchmarks ────────────────────────────────────────────────────────────────

fn bench_input_packets(c: &mut Criterion) {
    let token = ClientToken::from_u32(0x1234_5678);
    let mut group = c.benchmark_group("encode_input");
    for (name, packet) in [("button", make_button()), ("mouse", make_mouse())] {
        group.bench_function(name, |b| {
            b.iter(|| encode_datagrams(black_box(&packet), token, OverflowPolicy::Truncate))
        });
    }
    group.finish();
}

fn bench_fragmentation(c: &mut Criterion) {
    let token = ClientToken::from_u32(0x1234_5678);
    let mut group = c.benchmark_group("encode_notification");
    for icon_len in [0usize, 2_000, 16_000, 64_000] {
        let packet = make_notification(icon_len);
        group.bench_with_input(BenchmarkId::from_parameter(icon_len), &packet, |b, p| {
            b.iter(|| encode_datagrams(black_box(p), token, OverflowPolicy::Truncate))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_input_packets, bench_fragmentation);
criterion_main!(benches);
