use criterion::{black_box, criterion_group, criterion_main, Criterion};

use blink_codec_compact::{decode_one, encode};
use blink_core::{Message, QName, Registry, StaticGroupValue, Value};

/// 编解码基线：嵌套静态组的典型业务消息。
///
/// # 设计目的（Why）
/// - 以种子场景的 Company 消息作为固定负载，观测字段分派与 VLC 路径的
///   基线开销，防止后续改动引入退化。
///
/// # 契约说明（What）
/// - 基准不触碰 I/O；注册表与消息在计时循环外构建。
fn bench_company(c: &mut Criterion) {
    let registry = Registry::from_schema_text(
        "namespace Demo\n\
         Address/1 -> string Street, string City, u32 ZipCode\n\
         Employee/2 -> string Name, u32 Age, Address HomeAddress\n\
         Manager/3 : Employee -> string Department, u32 TeamSize\n\
         Company/4 -> string CompanyName, Manager CEO\n",
    )
    .unwrap();
    let home = StaticGroupValue::new()
        .with("Street", Value::str("123 Main St"))
        .with("City", Value::str("San Francisco"))
        .with("ZipCode", Value::UInt(94102));
    let ceo = StaticGroupValue::new()
        .with("Name", Value::str("Alice"))
        .with("Age", Value::UInt(45))
        .with("HomeAddress", Value::Group(home))
        .with("Department", Value::str("Engineering"))
        .with("TeamSize", Value::UInt(50));
    let message = Message::new(QName::new(Some("Demo"), "Company"))
        .with("CompanyName", Value::str("TechCorp"))
        .with("CEO", Value::Group(ceo));
    let encoded = encode(&message, &registry).unwrap();

    c.bench_function("compact_encode_company", |b| {
        b.iter(|| encode(black_box(&message), &registry).unwrap())
    });
    c.bench_function("compact_decode_company", |b| {
        b.iter(|| decode_one(black_box(&encoded), 0, &registry, true).unwrap())
    });
}

criterion_group!(compact_benches, bench_company);
criterion_main!(compact_benches);
