// 社区领域管理器
//
// 负责帖子列表、账户与本地存储

use std::sync::Arc;

use crate::account::AccountStore;
use crate::community::ListingEngine;
use crate::storage::BlobStore;

/// 社区领域管理器
#[derive(Clone)]
pub struct CommunityDomain {
    listing: Arc<ListingEngine>,
    accounts: Arc<AccountStore>,
    store: BlobStore,
}

impl CommunityDomain {
    pub fn new(listing: Arc<ListingEngine>, accounts: Arc<AccountStore>, store: BlobStore) -> Self {
        Self {
            listing,
            accounts,
            store,
        }
    }

    pub fn get_listing(&self) -> &Arc<ListingEngine> {
        &self.listing
    }

    pub fn get_accounts(&self) -> &Arc<AccountStore> {
        &self.accounts
    }

    /// 获取本地存储
    pub fn get_store(&self) -> &BlobStore {
        &self.store
    }
}
