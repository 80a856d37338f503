//! # Integration Tests
//!
//! End-to-end tests wiring the bridge components together over real
//! sockets. No external services are required: the upstream side is the
//! in-process hub behind a real TCP server, and recipients are local UDP
//! listeners.

#[cfg(test)]
mod e2e_tests {
    use std::time::Duration;

    use admission::parse_filter_lines;
    use contracts::{ChannelFrame, ChannelName, FetchMode, FetchOutcome, TailEndpoint, UpstreamClient};
    use dissemination::{Disseminator, RecipientRegistry};
    use ingestion::{Cycle, CycleOutcome, IngestSource, PeriodicPull, ResilienceController, TailReader};
    use tokio::io::AsyncWriteExt;
    use tokio::net::{TcpListener, UdpSocket};
    use tokio::time::timeout;
    use upstream::{MemoryHub, TcpUpstreamClient, UpstreamServer};

    async fn udp_listener() -> (UdpSocket, u16) {
        let socket = UdpSocket::bind(("127.0.0.1", 0)).await.unwrap();
        let port = socket.local_addr().unwrap().port();
        (socket, port)
    }

    async fn recv_payload(socket: &UdpSocket) -> Vec<u8> {
        let mut buf = [0u8; 1024];
        let (len, _) = timeout(Duration::from_secs(2), socket.recv_from(&mut buf))
            .await
            .expect("datagram should arrive")
            .unwrap();
        buf[..len].to_vec()
    }

    /// Full pull path: hub -> TCP server -> client -> controller -> UDP.
    #[tokio::test]
    async fn test_pull_bridge_delivers_over_real_sockets() {
        let hub = MemoryHub::default();
        let server = UpstreamServer::bind("127.0.0.1:0", hub.clone()).await.unwrap();
        hub.publish(ChannelFrame::new("met/wind", 1.0, &b"4.2,310.0"[..]))
            .unwrap();

        let (listener, port) = udp_listener().await;
        let mut caster =
            Disseminator::new(RecipientRegistry::parse_list(&format!("127.0.0.1:{port}")));
        caster.open(0).await.unwrap();

        let source = IngestSource::Pull(PeriodicPull::new(
            TcpUpstreamClient::new("e2e-pull"),
            server.server_address(),
            "met/wind",
            FetchMode::Newest,
            Duration::from_millis(5),
        ));
        let mut controller = ResilienceController::new(source, Duration::from_millis(5));
        assert!(controller.connect().await.unwrap());

        let frame = match controller.cycle().await.unwrap() {
            CycleOutcome::Data(frame) => frame,
            other => panic!("expected data, got: {other:?}"),
        };
        let report = caster.disseminate(&frame).await.unwrap();
        assert_eq!(report.delivered, 1);
        assert_eq!(recv_payload(&listener).await, b"4.2,310.0");

        controller.close().await.unwrap();
    }

    /// A failing recipient never blocks the others, and the next cycle
    /// still runs.
    #[tokio::test]
    async fn test_one_bad_recipient_does_not_stop_the_cycle() {
        let (good, good_port) = udp_listener().await;
        let registry =
            RecipientRegistry::parse_list(&format!("255.255.255.255:9,127.0.0.1:{good_port}"));
        let mut caster = Disseminator::new(registry);
        caster.open(0).await.unwrap();

        let report = caster
            .disseminate(&ChannelFrame::new("met/wind", 1.0, &b"one"[..]))
            .await
            .unwrap();
        assert_eq!(report.delivered, 1);
        assert_eq!(report.failed_count(), 1);
        assert_eq!(recv_payload(&good).await, b"one");

        let report = caster
            .disseminate(&ChannelFrame::new("met/wind", 2.0, &b"two"[..]))
            .await
            .unwrap();
        assert_eq!(report.delivered, 1);
        assert_eq!(recv_payload(&good).await, b"two");
    }

    /// Admission decides which pulled frames reach the recipients.
    #[tokio::test]
    async fn test_admission_gates_what_reaches_recipients() {
        let hub = MemoryHub::default();
        let server = UpstreamServer::bind("127.0.0.1:0", hub.clone()).await.unwrap();

        let mut filters = parse_filter_lines("wind 0 10\n");
        filters.bind_fields(&["wind"]);

        let (listener, port) = udp_listener().await;
        let mut caster =
            Disseminator::new(RecipientRegistry::parse_list(&format!("127.0.0.1:{port}")));
        caster.open(0).await.unwrap();

        let source = IngestSource::Pull(PeriodicPull::new(
            TcpUpstreamClient::new("e2e-filter"),
            server.server_address(),
            "met/wind",
            FetchMode::Newest,
            Duration::from_millis(5),
        ));
        let mut controller = ResilienceController::new(source, Duration::from_millis(5));
        assert!(controller.connect().await.unwrap());

        hub.publish(ChannelFrame::new("met/wind", 1.0, &b"50.0"[..]))
            .unwrap();
        let CycleOutcome::Data(vetoed) = controller.cycle().await.unwrap() else {
            panic!("expected the out-of-range frame");
        };
        assert!(!filters.admit(&vetoed.fields()).unwrap());

        hub.publish(ChannelFrame::new("met/wind", 2.0, &b"5.0"[..]))
            .unwrap();
        let CycleOutcome::Data(admitted) = controller.cycle().await.unwrap() else {
            panic!("expected the in-range frame");
        };
        assert!(filters.admit(&admitted.fields()).unwrap());

        caster.disseminate(&admitted).await.unwrap();
        assert_eq!(recv_payload(&listener).await, b"5.0");

        controller.close().await.unwrap();
    }

    /// Two partial reads in one tailing cycle come out as a single frame
    /// with the bytes in the order they were read.
    #[tokio::test]
    async fn test_tail_combines_partial_reads_in_read_order() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let feeder = tokio::spawn(async move {
            let (mut peer, _) = listener.accept().await.unwrap();
            peer.write_all(b"hello").await.unwrap();
            peer.flush().await.unwrap();
            tokio::time::sleep(Duration::from_millis(20)).await;
            peer.write_all(b", world").await.unwrap();
            peer.flush().await.unwrap();
            peer
        });

        let mut reader = TailReader::new(
            "met/raw",
            TailEndpoint::Tcp {
                addr: addr.to_string(),
            },
            false,
            Duration::from_millis(10),
        );
        reader.open().await.unwrap();

        // Both writes are on the wire before the cycle polls.
        let peer = feeder.await.unwrap();

        let frame = match reader.poll_cycle().await.unwrap() {
            Cycle::Data(frame) => frame,
            Cycle::Idle => panic!("expected a combined frame"),
        };
        assert_eq!(&frame.payload[..], b"hello, world");

        drop(peer);
        reader.close().await.unwrap();
    }

    /// Sequential fetch walks the retained history oldest-first over the
    /// real wire protocol.
    #[tokio::test]
    async fn test_sequential_fetch_walks_retained_history() {
        let hub = MemoryHub::default();
        let server = UpstreamServer::bind("127.0.0.1:0", hub.clone()).await.unwrap();
        for (ts, payload) in [(1.0, &b"a"[..]), (2.0, &b"b"[..]), (3.0, &b"c"[..])] {
            hub.publish(ChannelFrame::new("met/wind", ts, payload)).unwrap();
        }

        let mut client = TcpUpstreamClient::new("e2e-history");
        client.open(&server.server_address()).await.unwrap();

        let channel = ChannelName::new("met/wind");
        let mut seen = Vec::new();
        loop {
            match client
                .fetch(&channel, FetchMode::OldestSequential)
                .await
                .unwrap()
            {
                FetchOutcome::Data(frame) => seen.push(frame.timestamp),
                FetchOutcome::NoData => break,
            }
        }
        assert_eq!(seen, vec![1.0, 2.0, 3.0]);

        client.close().await.unwrap();
    }

    /// A configuration file resolves into working components.
    #[test]
    fn test_config_file_drives_component_construction() {
        let toml = r#"
channel = "met/wind"
recipients = "127.0.0.1:9101,127.0.0.1:9102"
"#;
        let config =
            config_loader::ConfigLoader::load_from_str(toml, config_loader::ConfigFormat::Toml)
                .unwrap();

        let registry = RecipientRegistry::from_option(config.recipients.as_deref()).unwrap();
        assert_eq!(registry.len(), 2);

        let caster = Disseminator::new(registry);
        assert!(!caster.is_open());
    }
}
