use crate::utils::error::Result;
use async_trait::async_trait;

/// 快取目錄 (存放存取票證 TA)
pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// 將 TRA 簽成 CMS (base64 DER)
#[async_trait]
pub trait TraSigner: Send + Sync {
    async fn sign(&self, tra: &str) -> Result<String>;

    /// 用於區分快取票證的識別 (例如憑證路徑)
    fn identity(&self) -> String;
}
