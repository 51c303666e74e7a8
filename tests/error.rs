use paperscout::error::ScoutError;

#[test]
fn status_codes_mark_transient() {
    let limited = ScoutError::ProviderStatus {
        status: 429,
        message: "slow down".to_string(),
    };
    let overloaded = ScoutError::ProviderStatus {
        status: 503,
        message: "busy".to_string(),
    };
    let bad_request = ScoutError::ProviderStatus {
        status: 400,
        message: "bad".to_string(),
    };
    assert!(limited.is_transient());
    assert!(limited.is_quota());
    assert!(overloaded.is_transient());
    assert!(!overloaded.is_quota());
    assert!(!bad_request.is_transient());
}

#[test]
fn message_markers_mark_transient() {
    let err = ScoutError::ProviderHttp("upstream said 429 Too Many Requests".to_string());
    assert!(err.is_transient());
    assert!(err.is_quota());

    let err = ScoutError::ProviderHttp("The model is overloaded".to_string());
    assert!(err.is_transient());
    assert!(!err.is_quota());

    let err = ScoutError::ProviderHttp("connection reset".to_string());
    assert!(!err.is_transient());
}

#[test]
fn into_quota_keeps_the_original_message() {
    let err = ScoutError::ProviderHttp("RESOURCE_EXHAUSTED".to_string()).into_quota();
    assert!(matches!(err, ScoutError::QuotaExceeded(ref message) if message.contains("RESOURCE_EXHAUSTED")));
}
