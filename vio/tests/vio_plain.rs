#[cfg(test)]
mod tests {
    use std::io::{Read, Write};
    use std::net::{SocketAddr, TcpListener, TcpStream};
    use std::thread;
    use std::time::Duration;

    use vio::{
        ErrorKind, ErrorOp, Family, Interest, Multiplexer, ReadinessEvent, SocketType, Source,
        Token, Vio, VioError, VioFlags,
    };

    fn listening_vio() -> (Vio, SocketAddr) {
        let mut listener = Vio::new();
        listener
            .socket(Family::Inet, SocketType::Stream, 0)
            .expect("Failed to create socket");
        listener
            .bind("127.0.0.1:0".parse().unwrap())
            .expect("Failed to bind");
        listener.listen(16).expect("Failed to listen");

        let addr = listener.local_addr().expect("Failed to get local address");
        (listener, addr)
    }

    /// Retries a non-blocking accept until a connection shows up.
    fn accept_blocking(listener: &mut Vio) -> Vio {
        let mut conn = Vio::new();

        for _ in 0..500 {
            if listener.accept(Some(&mut conn)).expect("Failed to accept") {
                return conn;
            }
            thread::sleep(Duration::from_millis(5));
        }

        panic!("no connection was accepted");
    }

    /// A server-side handle connected to a std peer.
    fn accepted_pair() -> (Vio, TcpStream) {
        let (mut listener, addr) = listening_vio();
        let peer = TcpStream::connect(addr).expect("Failed to connect to listener");
        let conn = accept_blocking(&mut listener);

        (conn, peer)
    }

    #[test]
    fn test_listen_takes_server_role() {
        let (listener, addr) = listening_vio();

        assert!(listener.is_server());
        assert!(!listener.is_client());
        assert!(!listener.is_closed());
        assert!(addr.port() != 0);
        assert_eq!(listener.address(), Some("127.0.0.1:0".parse().unwrap()));
    }

    #[test]
    fn test_accept_fills_new_handle() {
        let (mut listener, addr) = listening_vio();
        let peer = TcpStream::connect(addr).expect("Failed to connect to listener");
        let conn = accept_blocking(&mut listener);

        assert!(conn.fd().is_some());
        assert_ne!(conn.fd(), listener.fd());
        assert!(conn.is_client());
        assert!(!conn.is_server());
        assert!(!conn.is_connecting());
        assert!(!conn.is_closed());
        assert_eq!(
            conn.address(),
            Some(peer.local_addr().expect("Failed to get peer address"))
        );

        // The listener keeps its role.
        assert!(listener.is_server());
    }

    #[test]
    fn test_accept_without_pending_connection() {
        let (mut listener, _) = listening_vio();
        let mut conn = Vio::new();

        assert!(!listener.accept(Some(&mut conn)).expect("Failed to accept"));
        assert!(conn.fd().is_none());
        assert!(!listener.last_error().is_set());
        assert!(!listener.is_closed());
    }

    #[test]
    fn test_accept_without_target_is_misuse() {
        let (mut listener, addr) = listening_vio();
        let fd = listener.fd();
        let flags = listener.flags();
        let _peer = TcpStream::connect(addr).expect("Failed to connect to listener");

        let err = listener.accept(None).unwrap_err();

        assert_eq!(err.operation, ErrorOp::Accept);
        assert_eq!(err.kind, ErrorKind::ApiMisuse);
        assert_eq!(err.message, "accept not called with valid new VIO object");
        assert_eq!(listener.last_error(), &err);

        // Descriptor and flags are untouched.
        assert_eq!(listener.fd(), fd);
        assert_eq!(listener.flags(), flags);
        assert!(!listener.is_closed());

        // The pending connection is still there.
        let conn = accept_blocking(&mut listener);
        assert!(conn.is_client());
    }

    #[test]
    fn test_operations_without_socket_are_misuse() {
        let mut vio = Vio::new();
        let mut buffer = [0u8; 8];

        let err = vio.listen(4).unwrap_err();
        assert_eq!((err.operation, err.kind), (ErrorOp::Listen, ErrorKind::ApiMisuse));

        let err = vio.read(&mut buffer).unwrap_err();
        assert_eq!((err.operation, err.kind), (ErrorOp::Read, ErrorKind::ApiMisuse));

        let err = vio.write(b"data").unwrap_err();
        assert_eq!((err.operation, err.kind), (ErrorOp::Write, ErrorKind::ApiMisuse));

        let err = vio.bind("127.0.0.1:0".parse().unwrap()).unwrap_err();
        assert_eq!((err.operation, err.kind), (ErrorOp::Other, ErrorKind::ApiMisuse));

        assert!(!vio.is_closed());
    }

    #[test]
    fn test_connect_without_address_is_misuse() {
        let mut vio = Vio::new();
        vio.socket(Family::Inet, SocketType::Stream, 0)
            .expect("Failed to create socket");

        let err = vio.connect().unwrap_err();

        assert_eq!(err.operation, ErrorOp::Connect);
        assert_eq!(err.kind, ErrorKind::ApiMisuse);
        assert!(vio.fd().is_some());
        assert!(!vio.is_closed());
        assert!(!vio.is_connecting());
    }

    #[test]
    fn test_close_is_idempotent() {
        let (mut conn, _peer) = accepted_pair();

        conn.close();
        assert!(conn.is_closed());
        assert!(conn.fd().is_none());
        assert!(!conn.is_connecting());

        conn.close();
        assert!(conn.is_closed());
        assert!(conn.fd().is_none());
    }

    #[test]
    fn test_read_without_data_is_transient() {
        let (mut conn, _peer) = accepted_pair();
        let mut buffer = [0u8; 16];

        assert_eq!(conn.read(&mut buffer).expect("Failed to read"), 0);
        assert!(!conn.last_error().is_set());
        assert!(!conn.is_closed());
        assert!(conn.fd().is_some());
    }

    #[test]
    fn test_read_and_write_exchange_data() {
        let (mut conn, mut peer) = accepted_pair();

        peer.write_all(b"hello").expect("Failed to write to stream");

        let mut buffer = [0u8; 16];
        let mut n = 0;
        for _ in 0..500 {
            n = conn.read(&mut buffer).expect("Failed to read");
            if n > 0 {
                break;
            }
            thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(&buffer[..n], b"hello");

        assert_eq!(conn.write(b"world").expect("Failed to write"), 5);

        let mut reply = [0u8; 5];
        peer.read_exact(&mut reply).expect("Failed to read from stream");
        assert_eq!(&reply, b"world");
    }

    #[test]
    fn test_empty_buffers_make_no_progress() {
        let (mut conn, _peer) = accepted_pair();

        assert_eq!(conn.read(&mut []).expect("Failed to read"), 0);
        assert_eq!(conn.write(&[]).expect("Failed to write"), 0);
        assert!(!conn.is_closed());
    }

    #[test]
    fn test_peer_shutdown_is_remote_hangup() {
        let (mut conn, peer) = accepted_pair();
        drop(peer);

        let mut buffer = [0u8; 16];
        let mut result = Ok(0);
        for _ in 0..500 {
            result = conn.read(&mut buffer);
            if result != Ok(0) {
                break;
            }
            thread::sleep(Duration::from_millis(5));
        }

        let err = result.unwrap_err();
        assert_eq!(err.operation, ErrorOp::Read);
        assert_eq!(err.kind, ErrorKind::RemoteHangup);
        assert_eq!(err.to_string(), "Read error: Remote host closed the socket");
        assert!(conn.is_closed());
        assert!(conn.fd().is_none());
    }

    #[test]
    fn test_write_to_reset_peer_is_system_error() {
        let (mut conn, peer) = accepted_pair();
        drop(peer);

        let mut result = Ok(0);
        for _ in 0..500 {
            result = conn.write(b"payload");
            if result.is_err() {
                break;
            }
            thread::sleep(Duration::from_millis(5));
        }

        let err = result.unwrap_err();
        assert_eq!(err.operation, ErrorOp::Write);
        assert_eq!(err.kind, ErrorKind::System);
        assert!(!err.message.is_empty());
        assert!(conn.is_closed());
        assert!(conn.fd().is_none());
    }

    #[test]
    fn test_connect_stays_connecting_until_first_write() {
        let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind listener");
        let addr = listener.local_addr().expect("Failed to get local address");

        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().expect("Failed to accept connection");
            let mut buffer = [0; 4];
            stream
                .read_exact(&mut buffer)
                .expect("Failed to read from stream");
            assert_eq!(&buffer, b"ping");
        });

        let mut client = Vio::new();
        client
            .socket(Family::Inet, SocketType::Stream, 0)
            .expect("Failed to create socket");
        client.connect_to(addr).expect("Failed to connect");

        assert!(client.is_client());
        assert!(!client.is_server());
        assert!(client.is_connecting());

        let mut mux = Multiplexer::new().expect("Failed to create multiplexer");
        let fd = client.fd().expect("Client has no descriptor");
        mux.associate(Source::Fd, fd, Interest::WRITABLE, Token(0))
            .expect("Failed to associate");

        let mut events = [ReadinessEvent::default(); 1];
        let n = mux
            .get(&mut events, Some(Duration::from_secs(5)))
            .expect("Failed to poll");
        assert_eq!(n, 1);
        assert!(events[0].status.is_writable());

        assert_eq!(client.write(b"ping").expect("Failed to write"), 4);
        assert!(!client.is_connecting());

        mux.dissociate(Source::Fd, fd);
        handle.join().expect("Thread panicked");
    }

    #[test]
    fn test_error_reports_and_closes() {
        let (mut conn, _peer) = accepted_pair();
        conn.state_mut().record_error(VioError::new(
            ErrorOp::Other,
            ErrorKind::System,
            "injected failure",
        ));

        let err = conn.error();

        assert_eq!(err.to_string(), "Application error: injected failure");
        assert!(conn.is_closed());
        assert!(conn.fd().is_none());
        assert_eq!(conn.last_error(), &err);
    }

    #[test]
    fn test_socket_reopens_closed_handle() {
        let (mut conn, _peer) = accepted_pair();
        conn.close();

        conn.socket(Family::Inet, SocketType::Stream, 0)
            .expect("Failed to create socket");

        assert!(conn.fd().is_some());
        assert!(!conn.is_closed());
        assert!(!conn.flags().contains(VioFlags::IS_CONNECTING));
    }

    #[test]
    fn test_unspec_family_is_dual_stack() {
        let mut listener = Vio::new();

        // Hosts without IPv6 cannot create the socket at all.
        if listener
            .socket(Family::Unspec, SocketType::Stream, 0)
            .is_err()
        {
            return;
        }

        listener
            .bind("127.0.0.1:0".parse().unwrap())
            .expect("Failed to bind mapped address");
        listener.listen(16).expect("Failed to listen");

        let local = listener.local_addr().expect("Failed to get local address");
        assert!(local.is_ipv6());

        let stored = listener.address().expect("Address not stored");
        assert!(stored.is_ipv6());

        let v4: SocketAddr = format!("127.0.0.1:{}", local.port()).parse().unwrap();
        let _peer = TcpStream::connect(v4).expect("Failed to connect over IPv4");

        let conn = accept_blocking(&mut listener);
        assert!(conn.is_client());
    }

    #[test]
    fn test_socket_with_bad_protocol_is_system_error() {
        let mut vio = Vio::new();

        let err = vio.socket(Family::Inet, SocketType::Stream, 9999).unwrap_err();

        assert_eq!(err.operation, ErrorOp::Socket);
        assert_eq!(err.kind, ErrorKind::System);
        assert!(!err.message.is_empty());
        assert_eq!(vio.last_error(), &err);
        assert!(vio.fd().is_none());
        assert!(!vio.is_closed());
    }

    #[test]
    fn test_failed_socket_keeps_existing_descriptor() {
        let (mut listener, addr) = listening_vio();
        let fd = listener.fd();

        let err = listener
            .socket(Family::Inet, SocketType::Stream, 9999)
            .unwrap_err();
        assert_eq!((err.operation, err.kind), (ErrorOp::Socket, ErrorKind::System));

        assert_eq!(listener.fd(), fd);
        assert!(!listener.is_closed());
        assert!(listener.is_server());

        // The old descriptor still serves connections.
        let _peer = TcpStream::connect(addr).expect("Failed to connect to listener");
        let conn = accept_blocking(&mut listener);
        assert!(conn.is_client());
    }

    #[test]
    fn test_listen_on_datagram_socket_is_system_error() {
        let mut vio = Vio::new();
        vio.socket(Family::Inet, SocketType::Datagram, 0)
            .expect("Failed to create socket");

        let err = vio.listen(4).unwrap_err();

        assert_eq!(err.operation, ErrorOp::Listen);
        assert_eq!(err.kind, ErrorKind::System);
        assert_eq!(vio.last_error(), &err);
        assert!(!vio.is_server());
        assert!(vio.is_closed());
        assert!(vio.fd().is_none());
    }

    #[test]
    fn test_bind_to_used_address_is_system_error() {
        let taken = TcpListener::bind("127.0.0.1:0").expect("Failed to bind listener");
        let addr = taken.local_addr().expect("Failed to get local address");

        let mut vio = Vio::new();
        vio.socket(Family::Inet, SocketType::Stream, 0)
            .expect("Failed to create socket");

        let err = vio.bind(addr).unwrap_err();

        assert_eq!(err.operation, ErrorOp::Other);
        assert_eq!(err.kind, ErrorKind::System);
        assert_eq!(err.to_string(), format!("Application error: {}", err.message));
        assert!(vio.is_closed());
        assert!(vio.fd().is_none());
    }

    #[test]
    fn test_hard_connect_failure_is_not_connecting() {
        let mut vio = Vio::new();
        vio.socket(Family::Inet, SocketType::Stream, 0)
            .expect("Failed to create socket");

        // An IPv6 target on an IPv4 socket fails at once.
        let err = vio.connect_to("[::1]:80".parse().unwrap()).unwrap_err();

        assert_eq!(err.operation, ErrorOp::Connect);
        assert_eq!(err.kind, ErrorKind::System);
        assert!(!vio.is_connecting());
        assert!(!vio.is_client());
        assert!(vio.is_closed());
        assert!(vio.fd().is_none());
    }

    #[test]
    fn test_accept_on_unlistened_socket_is_system_error() {
        let mut vio = Vio::new();
        vio.socket(Family::Inet, SocketType::Stream, 0)
            .expect("Failed to create socket");
        let mut conn = Vio::new();

        let err = vio.accept(Some(&mut conn)).unwrap_err();

        assert_eq!(err.operation, ErrorOp::Accept);
        assert_eq!(err.kind, ErrorKind::System);
        assert!(vio.is_closed());
        assert!(vio.fd().is_none());
        assert!(conn.fd().is_none());
        assert!(!conn.last_error().is_set());
    }
}
