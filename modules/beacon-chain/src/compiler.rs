use std::sync::Arc;

use beacon_bus::Bus;
use beacon_record::{Chain, Direction, Topic};
use futures::FutureExt;
use tracing::warn;

use crate::error::ChainCompileError;

/// Result of wiring a chain into the bus: the (output, inputs) topic pairs
/// a forwarder now bridges. Useful for tests that want to assert wiring
/// without a live bus delivery.
#[derive(Debug, Clone)]
pub struct CompiledChain {
    pub name: String,
    pub wiring: Vec<(Topic, Topic)>,
}

/// Validates `chain`'s shape (length ≥ 2, no duplicate (actor, entity) pair
/// — I3), warns (does not fail) if a hop references an actor/entity the
/// caller doesn't recognize, then installs one forwarder subscription per
/// producer-entity × consumer-entity pair for every consecutive hop:
///
/// ```text
/// subscribe(output/<producer_actor>/<producer_entity>/<chain>,
///           λ(topic, record): publish(inputs/<consumer_actor>/<consumer_entity>/<chain>, record))
/// ```
///
/// This forwarder is the only thing that writes into `inputs/...` for
/// chain-level traffic; an actor's own handler is subscribed to its
/// `inputs/...` topic once, at actor construction, elsewhere.
pub async fn compile_chain(
    bus: &Arc<Bus>,
    chain: &Chain,
    entity_exists: impl Fn(&str, &str) -> bool,
) -> Result<CompiledChain, ChainCompileError> {
    chain.validate()?;

    for card in &chain.cards {
        for entity in &card.entities {
            if !entity_exists(&card.actor, entity) {
                warn!(
                    chain = %chain.name,
                    actor = %card.actor,
                    entity = %entity,
                    "chain references an actor/entity that does not exist"
                );
            }
        }
    }

    let mut wiring = Vec::new();

    for pair in chain.cards.windows(2) {
        let producer = &pair[0];
        let consumer = &pair[1];

        for producer_entity in &producer.entities {
            for consumer_entity in &consumer.entities {
                let output_topic = Topic::new(
                    Direction::Output,
                    producer.actor.clone(),
                    producer_entity.clone(),
                    chain.name.clone(),
                );
                let inputs_topic = Topic::new(
                    Direction::Inputs,
                    consumer.actor.clone(),
                    consumer_entity.clone(),
                    chain.name.clone(),
                );

                let bus_for_forward = bus.clone();
                let forward_target = inputs_topic.clone();
                bus.sub(
                    &output_topic,
                    Arc::new(move |_topic, record| {
                        let bus = bus_for_forward.clone();
                        let target = forward_target.clone();
                        async move {
                            bus.publish(&target, record).await;
                            Ok(())
                        }
                        .boxed()
                    }),
                )
                .await;

                wiring.push((output_topic, inputs_topic));
            }
        }
    }

    Ok(CompiledChain {
        name: chain.name.clone(),
        wiring,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use beacon_record::ChainCard;

    #[tokio::test]
    async fn wires_one_forwarder_per_producer_consumer_entity_pair() {
        let bus = Arc::new(Bus::new());
        let chain = Chain::new(
            "c",
            vec![
                ChainCard::new("p", vec!["p1".into(), "p2".into()]),
                ChainCard::new("c", vec!["c1".into()]),
            ],
        );

        let compiled = compile_chain(&bus, &chain, |_a, _e| true).await.unwrap();
        assert_eq!(compiled.wiring.len(), 2);
    }

    #[tokio::test]
    async fn rejects_duplicate_entity_loop() {
        let bus = Arc::new(Bus::new());
        let chain = Chain::new(
            "c",
            vec![
                ChainCard::new("f", vec!["f1".into()]),
                ChainCard::new("f", vec!["f1".into()]),
            ],
        );

        let result = compile_chain(&bus, &chain, |_a, _e| true).await;
        assert!(matches!(
            result,
            Err(ChainCompileError::Shape(beacon_record::RecordError::ChainDuplicateEntity { .. }))
        ));
    }
}
