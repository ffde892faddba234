use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::{Value, json};
use stationhub::{
    BoundedChannel, Config, Consumer, ConsumerConfig, DebugStage, MemoryBus, MemoryStore,
    Message, Producer, ProducerConfig, RandomIntegerSensor, SENSORS_TOPIC, Sensor, SensorPublisher,
    SensorsStage, StageFn, Supervisor, Topics, decode_message,
};

const FAST: Duration = Duration::from_millis(10);

async fn wait_until<F, Fut>(what: &str, mut check: F)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !check().await {
        assert!(tokio::time::Instant::now() < deadline, "timed out waiting for {what}");
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

/// Stage that records every decoded payload it sees.
fn recorder(name: &str, seen: Arc<Mutex<Vec<Value>>>) -> Arc<dyn stationhub::Stage> {
    StageFn::arc(name, move |m: &Message| {
        if let Some(v) = decode_message(Some(m)) {
            seen.lock().unwrap().push(v);
        }
        Ok(true)
    })
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn simulated_sensor_readings_land_in_the_store() {
    let broker = MemoryBus::new();
    let store = Arc::new(MemoryStore::new());
    let cfg = Config::default().with_interval(FAST);

    let sup = Supervisor::builder(cfg, Arc::new(broker.connect().await))
        .topics(SENSORS_TOPIC)
        .unwrap()
        .stage(Arc::new(SensorsStage::new(store.clone())))
        .unwrap()
        .stage(Arc::new(DebugStage))
        .unwrap()
        .build()
        .unwrap();
    let run = tokio::spawn({
        let sup = sup.clone();
        async move { sup.run().await }
    });

    let sensors: Vec<Arc<dyn Sensor>> = vec![Arc::new(RandomIntegerSensor::default())];
    let publisher = SensorPublisher::new(Arc::new(broker.connect().await), sensors, FAST);
    wait_until("three readings", || {
        let (publisher, store) = (&publisher, store.clone());
        async move {
            publisher.publish_once().await.unwrap();
            store.documents(SENSORS_TOPIC).await.len() >= 6
        }
    })
    .await;

    sup.stop();
    run.await.unwrap().unwrap();

    let docs = store.documents(SENSORS_TOPIC).await;
    assert_eq!(docs.len() % 2, 0, "readings are stored whole");
    for pair in docs.chunks(2) {
        assert_eq!(pair[0]["name"], json!("random_int_1"));
        assert_eq!(pair[1]["name"], json!("random_int_2"));
        assert_eq!(pair[0]["sensor_id"], json!(RandomIntegerSensor::ID));
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn order_survives_a_tiny_channel() {
    let broker = MemoryBus::new();
    let channel = Arc::new(BoundedChannel::new(1));
    let producer_cfg = ProducerConfig {
        poll_timeout: FAST,
        put_timeout: Duration::ZERO,
        tick: Duration::from_millis(1),
        max_pending: 0,
    };
    let producer = Arc::new(Producer::new(
        Arc::new(broker.connect().await),
        channel.clone(),
        Topics::parse("numbers").unwrap(),
        producer_cfg,
    ));
    let consumer = Arc::new(Consumer::new(
        channel,
        ConsumerConfig {
            get_timeout: FAST,
            tick: FAST,
        },
    ));
    let seen = Arc::new(Mutex::new(Vec::new()));
    consumer.add_stage(recorder("record", seen.clone())).await.unwrap();

    let p = tokio::spawn({
        let producer = producer.clone();
        async move { producer.run().await }
    });
    wait_until("subscription", || {
        let broker = broker.clone();
        async move { broker.subscribers("numbers").await == 1 }
    })
    .await;

    for n in 0..20_i64 {
        broker.publish("numbers", n).await;
    }
    let c = tokio::spawn({
        let consumer = consumer.clone();
        async move { consumer.run().await }
    });

    wait_until("all twenty", || {
        let seen = seen.clone();
        async move { seen.lock().unwrap().len() == 20 }
    })
    .await;

    producer.shutdown();
    consumer.shutdown();
    p.await.unwrap().unwrap();
    c.await.unwrap().unwrap();

    let expected: Vec<Value> = (0..20).map(|n| json!(n)).collect();
    assert_eq!(*seen.lock().unwrap(), expected);
    assert_eq!(producer.pending_len().await, 0);
    assert_eq!(broker.subscribers("numbers").await, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn stages_added_while_running_see_later_messages() {
    let broker = MemoryBus::new();
    let sup = Supervisor::builder(
        Config::default().with_interval(FAST),
        Arc::new(broker.connect().await),
    )
    .topics(["a", "b"])
    .unwrap()
    .build()
    .unwrap();
    let run = tokio::spawn({
        let sup = sup.clone();
        async move { sup.run().await }
    });
    wait_until("subscription", || {
        let broker = broker.clone();
        async move { broker.subscribers("b").await == 1 }
    })
    .await;

    let seen = Arc::new(Mutex::new(Vec::new()));
    sup.stages()
        .add(recorder("record", seen.clone()))
        .await
        .unwrap();
    assert!(sup.stages().add(recorder("record", seen.clone())).await.is_err());

    broker.publish("b", r#"{"k":1}"#).await;
    broker.publish("c", "not subscribed").await;
    wait_until("one message", || {
        let seen = seen.clone();
        async move { !seen.lock().unwrap().is_empty() }
    })
    .await;

    sup.stop();
    run.await.unwrap().unwrap();
    assert_eq!(*seen.lock().unwrap(), vec![json!({"k": 1})]);
}
