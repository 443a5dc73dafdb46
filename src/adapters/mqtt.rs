//! MQTT publish adapter.
//!
//! Implements [`PublishPort`] over the ESP-IDF MQTT client. Feedback events
//! are fire-and-forget (QoS 0): the interaction core never waits on the
//! broker, and a failed publish is reported once and dropped.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: `esp_idf_svc::mqtt::client::EspMqttClient`,
//!   with a background thread draining connection events so the client makes
//!   progress without blocking the poll loop.
//! - **all other targets**: records published messages in memory.

use log::info;

use crate::app::ports::PublishPort;
use crate::error::PublishError;

pub struct MqttPublisher {
    #[cfg(target_os = "espidf")]
    client: esp_idf_svc::mqtt::client::EspMqttClient<'static>,
    #[cfg(not(target_os = "espidf"))]
    published: Vec<(String, Vec<u8>)>,
}

impl MqttPublisher {
    /// Connect to the broker. Blocking-at-startup is acceptable here: the
    /// poll loop has not started yet.
    #[cfg(target_os = "espidf")]
    pub fn new(broker_url: &str, client_id: &str) -> Result<Self, crate::error::Error> {
        use esp_idf_svc::mqtt::client::{EspMqttClient, MqttClientConfiguration};

        let conf = MqttClientConfiguration {
            client_id: Some(client_id),
            ..Default::default()
        };

        let (client, mut connection) = EspMqttClient::new(broker_url, &conf)
            .map_err(|_| crate::error::Error::Init("MQTT client creation failed"))?;

        // Drain broker events so the client state machine advances; the
        // thread exits when the client (and thus the connection) is dropped.
        std::thread::spawn(move || {
            while let Ok(event) = connection.next() {
                log::debug!("MQTT event: {:?}", event.payload());
            }
        });

        info!("MQTT: client up ({})", broker_url);
        Ok(Self { client })
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn new(broker_url: &str, client_id: &str) -> Result<Self, crate::error::Error> {
        info!("MQTT(sim): client up ({}, id={})", broker_url, client_id);
        Ok(Self {
            published: Vec::new(),
        })
    }

    /// Messages recorded by the simulation backend.
    #[cfg(not(target_os = "espidf"))]
    pub fn published(&self) -> &[(String, Vec<u8>)] {
        &self.published
    }
}

impl PublishPort for MqttPublisher {
    #[cfg(target_os = "espidf")]
    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), PublishError> {
        use esp_idf_svc::mqtt::client::QoS;

        self.client
            .enqueue(topic, QoS::AtMostOnce, false, payload)
            .map(|_message_id| ())
            .map_err(|_| PublishError::Broker)
    }

    #[cfg(not(target_os = "espidf"))]
    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), PublishError> {
        info!(
            "MQTT(sim): publish {} {}",
            topic,
            String::from_utf8_lossy(payload)
        );
        self.published.push((topic.to_owned(), payload.to_vec()));
        Ok(())
    }
}
