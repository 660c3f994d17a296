//! ID mapping job tests: submission, polling and paginated results

use seqxref_ingest::uniprot::{UniProtConfig, UniProtError, UniProtFetcher, DEFAULT_LOOKUP_SOURCE};
use serde_json::json;
use wiremock::matchers::{body_string_contains, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const JOB_ID: &str = "27a020f6334184c4eb382111fbcad0e848f40300";

fn fetcher_for(server: &MockServer, poll_timeout_secs: u64) -> UniProtFetcher {
    let config = UniProtConfig::new()
        .with_primary_url(server.uri())
        .with_secondary_url(server.uri())
        .with_polling(20, poll_timeout_secs)
        .with_page_size(2);
    UniProtFetcher::new(config).unwrap()
}

async fn mount_submission(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/idmapping/run"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "jobId": JOB_ID })))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_do_lookup_polls_and_follows_pages() {
    let server = MockServer::start().await;
    mount_submission(&server).await;

    let status_path = format!("/idmapping/status/{JOB_ID}");
    Mock::given(method("GET"))
        .and(path(status_path.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "jobStatus": "RUNNING" })))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(status_path.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "jobStatus": "FINISHED" })))
        .mount(&server)
        .await;

    let results_path = format!("/idmapping/results/{JOB_ID}");
    // second page first so that cursor requests do not hit the first page mock
    Mock::given(method("GET"))
        .and(path(results_path.as_str()))
        .and(query_param("cursor", "abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [{ "from": "HBB", "to": "P68871" }]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(results_path.as_str()))
        .and(query_param("size", "2"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header(
                    "Link",
                    format!("<{}{}?cursor=abc&size=2>; rel=\"next\"", server.uri(), results_path).as_str(),
                )
                .set_body_json(json!({
                    "results": [
                        { "from": "HBA1", "to": "P69905" },
                        { "from": "HBA2", "to": "P69905" }
                    ]
                })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let fetcher = fetcher_for(&server, 10);
    let items = vec!["HBA1".to_string(), "HBA2".to_string(), "HBB".to_string()];
    let accessions = fetcher.do_lookup(&items, DEFAULT_LOOKUP_SOURCE).await.unwrap();

    assert_eq!(accessions, vec!["P69905", "P68871"]);
}

#[tokio::test]
async fn test_do_gene_lookup_reviewed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/idmapping/run"))
        .and(body_string_contains("taxId=9606"))
        .and(body_string_contains("ids=BRCA1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "jobId": JOB_ID })))
        .expect(1)
        .mount(&server)
        .await;
    // status already redirected to results
    Mock::given(method("GET"))
        .and(path(format!("/idmapping/status/{JOB_ID}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "results": [] })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/idmapping/uniprotkb/results/{JOB_ID}").as_str()))
        .and(query_param("fields", "accession"))
        .and(query_param("query", "reviewed:true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [
                { "from": "BRCA1", "to": { "primaryAccession": "P38398", "entryType": "UniProtKB reviewed (Swiss-Prot)" } }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let fetcher = fetcher_for(&server, 10);
    let accessions = fetcher.do_gene_lookup("BRCA1", 9606, true).await.unwrap();
    assert_eq!(accessions, vec!["P38398"]);
}

#[tokio::test]
async fn test_failed_job() {
    let server = MockServer::start().await;
    mount_submission(&server).await;
    Mock::given(method("GET"))
        .and(path(format!("/idmapping/status/{JOB_ID}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "jobStatus": "ERROR" })))
        .mount(&server)
        .await;

    let fetcher = fetcher_for(&server, 10);
    let result = fetcher.do_lookup(&["HBA1".to_string()], "Gene_Name").await;
    assert!(matches!(result, Err(UniProtError::JobFailed { .. })));
}

#[tokio::test]
async fn test_polling_times_out() {
    let server = MockServer::start().await;
    mount_submission(&server).await;
    Mock::given(method("GET"))
        .and(path(format!("/idmapping/status/{JOB_ID}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "jobStatus": "RUNNING" })))
        .mount(&server)
        .await;

    let fetcher = fetcher_for(&server, 1);
    let result = fetcher.do_gene_lookup("HBA1", 9606, false).await;
    assert!(matches!(result, Err(UniProtError::JobTimeout { timeout_secs: 1, .. })));
}

#[tokio::test]
async fn test_empty_lookup_skips_submission() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let fetcher = fetcher_for(&server, 1);
    assert!(fetcher.do_lookup(&[], DEFAULT_LOOKUP_SOURCE).await.unwrap().is_empty());
}
