pub mod wasms;

#[cfg(test)]
pub mod tests {
    use crate::wasms::TestWasm;
    use guestcall_host::prelude::*;
    use std::sync::Arc;
    use std::time::Duration;

    fn validate(input: &str) -> String {
        let output = invoke(
            TestWasm::Validation.bytes(),
            "validate_create_host_params",
            input.as_bytes(),
        )
        .unwrap();
        String::from_utf8(output).unwrap()
    }

    #[test]
    fn empty_object_comes_back_as_guest_data() {
        let output = validate("{}");
        assert!(output.starts_with(r#"{"type":"Error""#), "{output}");
        assert!(output.contains("missing field `hostname`"), "{output}");
    }

    #[test]
    fn valid_host_params() {
        assert_eq!(
            validate(r#"{"hostname":"example.com","ipv4":"10.0.0.1"}"#),
            r#"{"type":"Success","validated":{"hostname":"example.com","ipv4":"10.0.0.1"}}"#,
        );
    }

    #[test]
    fn guest_rejection_is_not_a_host_error() {
        assert_eq!(
            validate(r#"{"hostname":"localhost","ipv4":"192.168.13.37"}"#),
            r#"{"type":"Error","error":"illegal hostname","path":"hostname"}"#,
        );
        assert_eq!(
            validate(r#"{"hostname":"example.com","ipv4":"127.0.0.1"}"#),
            r#"{"type":"Error","error":"illegal ipv4 address","path":"ipv4"}"#,
        );
    }

    #[test]
    fn bad_json_has_no_path() {
        let output: serde_json::Value = serde_json::from_str(&validate("{not json")).unwrap();
        assert_eq!(output["type"], "Error");
        assert!(output["path"].is_null());

        let output: serde_json::Value =
            serde_json::from_str(&validate(r#"{"hostname":"example.com","ipv4":"nope"}"#))
                .unwrap();
        assert_eq!(output["path"], "ipv4");
    }

    #[test]
    fn missing_allocator_fails_to_open() {
        let err = RuntimeSession::open(TestWasm::Empty.bytes(), "anything").unwrap_err();
        assert!(matches!(err.error, WasmErrorInner::InstantiationFailed(_)));
    }

    #[test]
    fn missing_target_fails_to_open() {
        let err = TestWasm::Io.session("not_exported").unwrap_err();
        assert!(matches!(err.error, WasmErrorInner::InstantiationFailed(_)));
    }

    #[test]
    fn oversized_result_releases_input() {
        let mut session = TestWasm::Io.session("oversized_bytes").unwrap();
        let err = session.invoke("oversized_bytes", b"input").unwrap_err();
        assert!(matches!(err.error, WasmErrorInner::OutOfRange(_)));
        assert_eq!(
            session.stats(),
            AllocationStats {
                reserved: 2,
                released: 2
            }
        );
        assert!(session.take_release_failure().is_none());
        assert!(!session.is_poisoned());
        assert_eq!(
            session.invoke("echo_bytes", b"still fine").unwrap(),
            b"still fine".to_vec()
        );
    }

    #[test]
    fn io_round_trips() {
        let mut session = TestWasm::Io.session("echo_bytes").unwrap();
        let inputs: [&[u8]; 4] = [b"", b"a", b"{\"hostname\":\"x\"}", &[0; 100_000]];
        for input in inputs {
            assert_eq!(session.invoke("echo_bytes", input).unwrap(), input.to_vec());
            let reversed: Vec<u8> = input.iter().rev().copied().collect();
            assert_eq!(session.invoke("reverse_bytes", input).unwrap(), reversed);
        }
        assert!(session.invoke("empty_bytes", b"ignored").unwrap().is_empty());
        let stats = session.stats();
        assert_eq!(stats.reserved, 18);
        assert_eq!(stats.live(), 0);
    }

    #[test]
    fn guest_memory_growth_is_seen_by_the_host() {
        let mut session = TestWasm::Io.session("big_bytes").unwrap();
        let before = session.memory_size().unwrap();
        let output = session.invoke("big_bytes", b"ab").unwrap();
        assert_eq!(output.len(), 3 * 1024 * 1024);
        assert_eq!(&output[..4], b"abab");
        assert!(session.memory_size().unwrap() > before);
    }

    #[test]
    fn guest_panic_poisons_the_session() {
        let mut session = TestWasm::Io.session("panic_bytes").unwrap();
        let err = session.invoke("panic_bytes", b"boom").unwrap_err();
        assert!(matches!(err.error, WasmErrorInner::GuestCallFailed(_)));
        assert!(session.is_poisoned());
        assert_eq!(session.stats().live(), 0);
    }

    #[test]
    fn metering_stops_a_spinning_guest() {
        let config = InvokeConfig::default().with_metering_limit(1_000_000);
        let mut session = ModuleBuilder::new(&config)
            .from_binary(TestWasm::Io.bytes())
            .unwrap()
            .instantiate("spin_bytes")
            .unwrap();
        let err = session.invoke("spin_bytes", b"spin").unwrap_err();
        assert!(matches!(err.error, WasmErrorInner::GuestCallFailed(_)));
    }

    #[test]
    fn deadline_tears_the_session_down() {
        let config = InvokeConfig::default()
            .with_metering_limit(1_000_000_000)
            .with_timeout(Duration::from_millis(20));
        let err = invoke_with_config(TestWasm::Io.bytes(), "spin_bytes", b"spin", &config)
            .unwrap_err();
        assert_eq!(err.error, WasmErrorInner::Timeout(20));

        let session = ModuleBuilder::new(&config)
            .from_binary(TestWasm::Io.bytes())
            .unwrap()
            .instantiate("spin_bytes")
            .unwrap();
        let timed = invoke_with_deadline(session, "spin_bytes", b"spin", Duration::from_millis(20));
        assert!(timed.session.is_none());
        assert_eq!(timed.result.unwrap_err().error, WasmErrorInner::Timeout(20));
        // the worker only lets go once the guest is out of points, and then the session is closed
        assert!(timed.abandoned.unwrap().join().unwrap());
    }

    #[test]
    fn pooled_validation() {
        let pool = Arc::new(SessionPool::new(
            TestWasm::Validation.module().unwrap(),
            "validate_create_host_params",
            &InvokeConfig::default(),
        ));
        pool.warm(2).unwrap();
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let pool = Arc::clone(&pool);
                std::thread::spawn(move || {
                    let input = format!(r#"{{"hostname":"host{i}","ipv4":"10.0.0.{i}"}}"#);
                    let output = pool.invoke(input.as_bytes()).unwrap();
                    let output: serde_json::Value = serde_json::from_slice(&output).unwrap();
                    assert_eq!(output["type"], "Success");
                    assert_eq!(output["validated"]["hostname"], format!("host{i}"));
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert!(pool.idle() >= 1);
    }
}
